//! Test fixtures.

mod loopback;

pub use loopback::{LoopbackFixture, TestUser};
