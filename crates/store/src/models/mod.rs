//! Domain records, create/update inputs and filterable field sets.
//!
//! Update inputs follow one convention: `None` leaves a column untouched,
//! and for nullable columns `Some(None)` clears it.

pub mod account;
pub mod brand;
pub mod category;
pub mod product;
pub mod product_image;
pub mod session;
pub mod settings;
pub mod slider;
pub mod top_bar;
pub mod translation;
pub mod user;
pub mod verification_token;

pub use account::{Account, AccountField, CreateAccountInput, UpdateAccountInput};
pub use brand::{BrandField, CreateBrandInput, ProductBrand, UpdateBrandInput};
pub use category::{
    Category, CategoryField, CategoryNode, CreateCategoryInput, UpdateCategoryInput, build_tree,
};
pub use product::{CreateProductInput, Product, ProductField, UpdateProductInput};
pub use product_image::{
    CreateProductImageInput, ProductImage, ProductImageField, UpdateProductImageInput,
};
pub use session::{CreateSessionInput, Session, SessionField, SessionWithUser, UpdateSessionInput};
pub use settings::{CreateSettingInput, Setting, SettingField, UpdateSettingInput};
pub use slider::{CreateSliderInput, SlideContent, Slider, SliderField, UpdateSliderInput, Viewport};
pub use top_bar::{CreateTopBarInput, TopBar, TopBarField, UpdateTopBarInput};
pub use translation::{CreateTranslationInput, Translation, TranslationField, UpdateTranslationInput};
pub use user::{CreateUserInput, UpdateUserInput, User, UserField};
pub use verification_token::{
    CreateVerificationTokenInput, VerificationToken, VerificationTokenField, VerificationTokenKey,
};
