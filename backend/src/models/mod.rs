pub mod catalog;
pub mod event;
pub mod macros;
pub mod round;
pub mod time;
pub mod window;

pub use catalog::*;
pub use event::*;
pub use round::*;
pub use time::*;
pub use window::*;
