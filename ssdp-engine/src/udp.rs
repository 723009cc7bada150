use ::std::net::{Ipv4Addr, SocketAddr};

/// The list of system calls which can return errors
#[non_exhaustive]
#[derive(Debug)]
pub enum Syscall {
    /// recvfrom() returned an error
    Recvfrom,
    /// sendto() returned an error
    Sendto,
    /// setsockopt(IP_ADD_MEMBERSHIP) returned an error
    JoinMulticast,
    /// setsockopt(IP_DROP_MEMBERSHIP) returned an error
    LeaveMulticast,
}

/// The errors which can be returned from UDP trait methods
#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// A system call returned an error
    Syscall(Syscall, ::std::io::Error),
}

impl ::core::fmt::Display for Error {
    fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
        let Self::Syscall(s, _) = self;
        write!(f, "error from syscall {s:?}")
    }
}

impl ::std::error::Error for Error {
    fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
        let Self::Syscall(_, e) = self;
        Some(e)
    }
}

/// Sending UDP datagrams
pub trait SendTo {
    /// Send a UDP datagram, filled in by a callback
    ///
    /// The callback is given a buffer of `size` bytes, and returns how
    /// many of them it used.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying sendto call fails (including
    /// if it would block).
    ///
    fn send_with<F>(
        &self,
        size: usize,
        to: &SocketAddr,
        f: F,
    ) -> Result<(), Error>
    where
        F: FnOnce(&mut [u8]) -> usize;
}

/// Receiving UDP datagrams
pub trait Receive {
    /// Receive a UDP datagram, recording who sent it
    ///
    /// # Errors
    ///
    /// Returns `Err` if the underlying recvfrom call fails (including
    /// if it would block).
    ///
    fn receive_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<(usize, SocketAddr), Error>;
}

/// Joining and leaving IPv4 multicast groups
pub trait Multicast {
    /// Join a multicast group on the interface with the given address
    ///
    /// `Ipv4Addr::UNSPECIFIED` lets the system choose the interface.
    ///
    /// # Errors
    ///
    /// Can only fail if the underlying system call fails.
    ///
    fn join_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error>;

    /// Leave a multicast group on the interface with the given address
    ///
    /// # Errors
    ///
    /// Can only fail if the underlying system call fails.
    ///
    fn leave_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error>;
}

/// Trait implementations for `std::net` sockets, and socket setup
pub mod std;
pub use self::std::setup_socket;

/// Trait implementations for Tokio sockets
#[cfg(feature = "async")]
pub mod tokio;
