mod input;
mod state;

pub use input::{Buttons, Input, InputEdge};
pub use state::{Color, Player, Role};
