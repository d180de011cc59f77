//! Integration tests for users, accounts, sessions and verification tokens.

use chrono::{Duration, Utc};

use catalog_core::{Role, UserId};
use catalog_integration_tests::{create_user, email, store};
use catalog_store::models::{
    CreateAccountInput, CreateSessionInput, CreateUserInput, CreateVerificationTokenInput,
    UpdateUserInput, VerificationTokenKey,
};
use catalog_store::{
    AccountRepository, RepositoryError, SessionRepository, UserRepository,
    VerificationTokenRepository,
};

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_user_round_trip() {
    let pool = store().await;
    let users = UserRepository::new(&pool);

    let created = users
        .create(&CreateUserInput {
            name: Some("Ada".to_owned()),
            email: Some(email("Ada@Example.com")),
            role: Role::Admin,
            ..CreateUserInput::default()
        })
        .await
        .unwrap();

    let found = users.get(&created.id).await.unwrap();
    assert_eq!(found, created);
    assert_eq!(found.name.as_deref(), Some("Ada"));
    assert_eq!(found.email.as_ref().map(|e| e.as_str()), Some("ada@example.com"));
    assert_eq!(found.role, Role::Admin);
}

#[tokio::test]
async fn test_duplicate_email_is_rejected() {
    let pool = store().await;
    create_user(&pool, "dup@example.com").await;

    let err = UserRepository::new(&pool)
        .create(&CreateUserInput {
            email: Some(email("DUP@example.com")),
            ..CreateUserInput::default()
        })
        .await
        .unwrap_err();

    match err {
        RepositoryError::ConstraintViolation {
            entity, fields, ..
        } => {
            assert_eq!(entity, "User");
            assert_eq!(fields, vec!["email".to_owned()]);
        }
        other => panic!("expected ConstraintViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_users_without_email_do_not_collide() {
    let pool = store().await;
    let users = UserRepository::new(&pool);

    users.create(&CreateUserInput::default()).await.unwrap();
    users.create(&CreateUserInput::default()).await.unwrap();
}

#[tokio::test]
async fn test_update_and_find_by_email() {
    let pool = store().await;
    let users = UserRepository::new(&pool);
    let user = create_user(&pool, "old@example.com").await;

    let updated = users
        .update(
            &user.id,
            &UpdateUserInput {
                email: Some(Some(email("new@example.com"))),
                image: Some(Some("https://cdn.example.com/a.png".to_owned())),
                ..UpdateUserInput::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.image.as_deref(), Some("https://cdn.example.com/a.png"));

    assert!(users.find_by_email(&email("old@example.com")).await.unwrap().is_none());
    let found = users.find_by_email(&email("new@example.com")).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let pool = store().await;
    let users = UserRepository::new(&pool);
    let missing = UserId::new(404);

    assert!(users.find_by_id(&missing).await.unwrap().is_none());
    assert!(users.get(&missing).await.unwrap_err().is_not_found());
    assert!(
        users
            .update(&missing, &UpdateUserInput::default())
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(users.delete(&missing).await.unwrap_err().is_not_found());
}

// =============================================================================
// Accounts
// =============================================================================

#[tokio::test]
async fn test_account_compound_uniqueness() {
    let pool = store().await;
    let alice = create_user(&pool, "alice@example.com").await;
    let bob = create_user(&pool, "bob@example.com").await;
    let accounts = AccountRepository::new(&pool);

    accounts
        .create(&CreateAccountInput::new(alice.id, "oauth", "github", "1001"))
        .await
        .unwrap();
    // Same provider id at another provider is fine.
    accounts
        .create(&CreateAccountInput::new(bob.id, "oauth", "google", "1001"))
        .await
        .unwrap();

    let err = accounts
        .create(&CreateAccountInput::new(bob.id, "oauth", "github", "1001"))
        .await
        .unwrap_err();
    match err {
        RepositoryError::ConstraintViolation { fields, .. } => {
            assert_eq!(
                fields,
                vec!["provider".to_owned(), "provider_account_id".to_owned()]
            );
        }
        other => panic!("expected ConstraintViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_account_requires_existing_user() {
    let pool = store().await;

    let err = AccountRepository::new(&pool)
        .create(&CreateAccountInput::new(UserId::new(99), "oauth", "github", "1"))
        .await
        .unwrap_err();

    match err {
        RepositoryError::ForeignKeyViolation {
            entity,
            field,
            constraint,
        } => {
            assert_eq!(entity, "Account");
            assert_eq!(field, "user_id");
            assert_eq!(constraint, "accounts_user_id_fkey");
        }
        other => panic!("expected ForeignKeyViolation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_deleting_user_removes_accounts_and_sessions() {
    let pool = store().await;
    let user = create_user(&pool, "owner@example.com").await;
    let accounts = AccountRepository::new(&pool);
    let sessions = SessionRepository::new(&pool);

    let github = accounts
        .create(&CreateAccountInput::new(user.id, "oauth", "github", "42"))
        .await
        .unwrap();
    let google = accounts
        .create(&CreateAccountInput::new(user.id, "oauth", "google", "42"))
        .await
        .unwrap();
    let session = sessions
        .create(&CreateSessionInput {
            session_token: "tok-1".to_owned(),
            user_id: user.id,
            expires: Utc::now() + Duration::days(1),
        })
        .await
        .unwrap();

    UserRepository::new(&pool).delete(&user.id).await.unwrap();

    assert!(accounts.find_by_id(&github.id).await.unwrap().is_none());
    assert!(accounts.find_by_id(&google.id).await.unwrap().is_none());
    assert!(sessions.find_by_id(&session.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_link_and_unlink_account() {
    let pool = store().await;
    let user = create_user(&pool, "link@example.com").await;
    let users = UserRepository::new(&pool);

    users
        .link_account(&CreateAccountInput::new(user.id, "oauth", "github", "7"))
        .await
        .unwrap();

    let found = users.find_by_account("github", "7").await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert_eq!(
        AccountRepository::new(&pool)
            .list_for_user(user.id)
            .await
            .unwrap()
            .len(),
        1
    );

    users.unlink_account("github", "7").await.unwrap();
    assert!(users.find_by_account("github", "7").await.unwrap().is_none());
    assert!(
        users
            .unlink_account("github", "7")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

// =============================================================================
// Sessions
// =============================================================================

#[tokio::test]
async fn test_session_lookup_with_user() {
    let pool = store().await;
    let user = create_user(&pool, "session@example.com").await;
    let sessions = SessionRepository::new(&pool);

    sessions
        .create(&CreateSessionInput {
            session_token: "secret".to_owned(),
            user_id: user.id,
            expires: Utc::now() + Duration::hours(1),
        })
        .await
        .unwrap();

    let found = sessions.find_with_user("secret").await.unwrap().unwrap();
    assert_eq!(found.user, user);
    assert_eq!(found.session.session_token, "secret");
    assert!(sessions.find_with_user("other").await.unwrap().is_none());

    sessions.delete_by_token("secret").await.unwrap();
    assert!(sessions.find_by_token("secret").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_session_token_is_rejected() {
    let pool = store().await;
    let user = create_user(&pool, "twice@example.com").await;
    let sessions = SessionRepository::new(&pool);
    let input = CreateSessionInput {
        session_token: "same".to_owned(),
        user_id: user.id,
        expires: Utc::now() + Duration::hours(1),
    };

    sessions.create(&input).await.unwrap();
    let err = sessions.create(&input).await.unwrap_err();
    assert!(matches!(err, RepositoryError::ConstraintViolation { .. }));
}

#[tokio::test]
async fn test_delete_expired_sessions() {
    let pool = store().await;
    let user = create_user(&pool, "expiry@example.com").await;
    let sessions = SessionRepository::new(&pool);
    let now = Utc::now();

    for (token, offset) in [("a", -2), ("b", -1), ("c", 1)] {
        sessions
            .create(&CreateSessionInput {
                session_token: token.to_owned(),
                user_id: user.id,
                expires: now + Duration::hours(offset),
            })
            .await
            .unwrap();
    }

    assert_eq!(sessions.delete_expired(now).await.unwrap(), 2);
    assert!(sessions.find_by_token("c").await.unwrap().is_some());
}

// =============================================================================
// Verification Tokens
// =============================================================================

#[tokio::test]
async fn test_verification_token_is_used_once() {
    let pool = store().await;
    let tokens = VerificationTokenRepository::new(&pool);
    let now = Utc::now();

    tokens
        .create(&CreateVerificationTokenInput {
            identifier: "login@example.com".to_owned(),
            token: "abc123".to_owned(),
            expires: now + Duration::minutes(10),
        })
        .await
        .unwrap();

    let key = VerificationTokenKey::new("login@example.com", "abc123");
    let used = tokens.use_token(&key, now).await.unwrap();
    assert_eq!(used.map(|t| t.token), Some("abc123".to_owned()));
    assert!(tokens.use_token(&key, now).await.unwrap().is_none());
    assert!(tokens.find_by_id(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_verification_token_is_not_used() {
    let pool = store().await;
    let tokens = VerificationTokenRepository::new(&pool);
    let now = Utc::now();

    tokens
        .create(&CreateVerificationTokenInput {
            identifier: "late@example.com".to_owned(),
            token: "old".to_owned(),
            expires: now - Duration::minutes(1),
        })
        .await
        .unwrap();

    let key = VerificationTokenKey::new("late@example.com", "old");
    assert!(tokens.use_token(&key, now).await.unwrap().is_none());
    assert!(tokens.find_by_id(&key).await.unwrap().is_some());
    assert_eq!(tokens.delete_expired(now).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_verification_token_is_rejected() {
    let pool = store().await;
    let tokens = VerificationTokenRepository::new(&pool);
    let input = CreateVerificationTokenInput {
        identifier: "dup@example.com".to_owned(),
        token: "t".to_owned(),
        expires: Utc::now() + Duration::minutes(5),
    };

    tokens.create(&input).await.unwrap();
    let err = tokens.create(&input).await.unwrap_err();
    match err {
        RepositoryError::ConstraintViolation { fields, .. } => {
            assert_eq!(fields, vec!["identifier".to_owned(), "token".to_owned()]);
        }
        other => panic!("expected ConstraintViolation, got {other:?}"),
    }
}
