//! Listener setup
//!
//! Creates TCP listeners with `SO_REUSEPORT` and `SO_REUSEADDR` enabled so a
//! replacement process can bind the address while sockets from the previous
//! run are still draining.

use std::net::SocketAddr;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

/// Create a tokio `TcpListener` bound to `addr` with reuse flags set
///
/// # Errors
///
/// Returns an error if the socket cannot be created, configured or bound.
pub fn create_reusable_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_port(true)?;
    socket.set_reuse_address(true)?;
    // Must be non-blocking before the fd is handed to tokio
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
