pub mod transport;

pub use self::transport::Transport;
