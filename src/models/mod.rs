pub mod ability;
pub mod character;
pub mod damage;
pub mod session;
pub mod settings;

pub use ability::Ability;
pub use character::{Character, CharacterKind};
pub use damage::DamageComponent;
pub use session::CombatSession;
pub use settings::{NamingMode, ParserSettings};
