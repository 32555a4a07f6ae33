pub mod edit;
pub mod extract;
pub mod inspect;
