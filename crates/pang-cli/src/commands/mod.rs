pub mod history;
pub mod identity;
pub mod listen;
pub mod send;
pub mod suggest;
