mod engine;
mod view;

// Public API of the quiz session subsystem.
pub use engine::{QuizEngine, StartRequest};
pub use view::SessionView;
