pub mod change;
pub mod html_diff;
pub mod options;
