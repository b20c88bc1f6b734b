pub mod fixtures;
pub mod mocks;

#[allow(unused_imports)]
pub use fixtures::{
    resolver_for, resolver_with_remotes, snapshot, snapshot_unchecked, write_hosted_artifact,
};
#[allow(unused_imports)]
pub use mocks::MockRemote;
