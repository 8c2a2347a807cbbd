//! Entity module - SeaORM entity definitions for the ledger and catalog tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod approved_food;
pub mod benefit;
pub mod product;
pub mod sea_orm_active_enums;
pub mod system_state;
pub mod transaction;
pub mod transaction_item;

pub use approved_food::{
    Column as ApprovedFoodColumn, Entity as ApprovedFood, Model as ApprovedFoodModel,
};
pub use benefit::{Column as BenefitColumn, Entity as Benefit, Model as BenefitModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use sea_orm_active_enums::{BenefitCategory, Unit};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use transaction_item::{
    Column as TransactionItemColumn, Entity as TransactionItem, Model as TransactionItemModel,
};
