pub mod harness;

pub use harness::TestAuthority;
