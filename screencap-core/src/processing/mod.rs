pub mod compositor;
pub mod mix_bus;
