pub mod backplane;
pub mod dispatch;
pub mod local;
pub mod pins;
pub mod protocol;
pub mod register_access;
pub mod register_file;
pub mod remote;
pub mod server;

pub use backplane::Backplane;
pub use dispatch::Access;
pub use local::LocalAccess;
pub use register_access::{AccessError, PinIndex, RegisterAccess};
pub use register_file::RegisterFile;
pub use remote::{RemoteAccess, TcpRemoteAccess};
pub use server::CommandServer;
