mod list;
mod middleware;

pub use list::{HttpState, build_router};
