use super::{Error, Syscall};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

type NewSocketFn = fn() -> std::io::Result<socket2::Socket>;
type SockoptFn = fn(&socket2::Socket, bool) -> std::io::Result<()>;
type BindFn = fn(&socket2::Socket, SocketAddrV4) -> std::io::Result<()>;

fn setup_socket_inner(
    port: u16,
    new_socket: NewSocketFn,
    nonblocking: SockoptFn,
    reuse_address: SockoptFn,
    bind: BindFn,
) -> std::io::Result<UdpSocket> {
    let socket = new_socket()?;
    nonblocking(&socket, true)?;
    reuse_address(&socket, true)?;
    bind(&socket, SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))?;
    Ok(socket.into())
}

/// Create a non-blocking UDP socket bound to `0.0.0.0:port`
///
/// The socket has `SO_REUSEADDR` set, so that several SSDP
/// implementations on one host can all listen on port 1900.
///
/// # Errors
///
/// Passes on errors from the underlying system calls.
///
pub fn setup_socket(port: u16) -> Result<UdpSocket, std::io::Error> {
    setup_socket_inner(
        port,
        || {
            socket2::Socket::new(
                socket2::Domain::IPV4,
                socket2::Type::DGRAM,
                None,
            )
        },
        socket2::Socket::set_nonblocking,
        socket2::Socket::set_reuse_address,
        |s, a| s.bind(&socket2::SockAddr::from(a)),
    )
}

impl super::SendTo for UdpSocket {
    fn send_with<F>(
        &self,
        size: usize,
        to: &SocketAddr,
        f: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        let mut buffer = vec![0u8; size];
        let actual_size = f(&mut buffer);
        self.send_to(&buffer[0..actual_size], to)
            .map(|_| ())
            .map_err(|e| Error::Syscall(Syscall::Sendto, e))
    }
}

impl super::Receive for UdpSocket {
    fn receive_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<(usize, SocketAddr), Error> {
        self.recv_from(buffer)
            .map_err(|e| Error::Syscall(Syscall::Recvfrom, e))
    }
}

impl super::Multicast for UdpSocket {
    fn join_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.join_multicast_v4(multicast_address, interface)
            .map_err(|e| Error::Syscall(Syscall::JoinMulticast, e))
    }

    fn leave_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.leave_multicast_v4(multicast_address, interface)
            .map_err(|e| Error::Syscall(Syscall::LeaveMulticast, e))
    }
}
