pub mod impl_console;
pub mod impl_fake;
pub mod interface;
