//! Plain records exchanged between the checkout steps, the store and the controller.

pub mod cart;
pub mod order;
pub mod steps;

pub use cart::*;
pub use order::*;
pub use steps::*;
