//! Wire types shared by the relay server and the client network adapter.

pub mod protocol;
pub mod vec3;
