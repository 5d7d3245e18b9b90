pub mod debounce;
pub mod ws;
