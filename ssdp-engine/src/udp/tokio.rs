use super::{Error, Syscall};
use std::net::{Ipv4Addr, SocketAddr};

impl super::SendTo for tokio::net::UdpSocket {
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
        self.try_send_to(&buffer[0..actual_size], *to)
            .map(|_| ())
            .map_err(|e| Error::Syscall(Syscall::Sendto, e))
    }
}

impl super::Receive for tokio::net::UdpSocket {
    fn receive_from(
        &self,
        buffer: &mut [u8],
    ) -> Result<(usize, SocketAddr), Error> {
        self.try_recv_from(buffer)
            .map_err(|e| Error::Syscall(Syscall::Recvfrom, e))
    }
}

impl super::Multicast for tokio::net::UdpSocket {
    fn join_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.join_multicast_v4(*multicast_address, *interface)
            .map_err(|e| Error::Syscall(Syscall::JoinMulticast, e))
    }

    fn leave_multicast_group(
        &self,
        multicast_address: &Ipv4Addr,
        interface: &Ipv4Addr,
    ) -> Result<(), Error> {
        self.leave_multicast_v4(*multicast_address, *interface)
            .map_err(|e| Error::Syscall(Syscall::LeaveMulticast, e))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Multicast, Receive, SendTo};
    use super::*;

    #[test]
    #[cfg_attr(miri, ignore)]
    fn tokio_traits() {
        let tx = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        tx.set_nonblocking(true).unwrap();
        let tx_addr = tx.local_addr().unwrap();
        let rx = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
        rx.set_nonblocking(true).unwrap();
        let rx_addr = rx.local_addr().unwrap();

        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(async {
                let tx = tokio::net::UdpSocket::from_std(tx).unwrap();
                let rx = tokio::net::UdpSocket::from_std(rx).unwrap();

                tx.writable().await.unwrap();
                let r = tx.send_with(512, &rx_addr, |b| {
                    b[0..3].copy_from_slice(b"foo");
                    3
                });
                assert!(r.is_ok());

                let mut buf = [0u8; 1500];
                let (n, wasfrom) = loop {
                    rx.readable().await.unwrap();
                    match rx.receive_from(&mut buf) {
                        Ok(r) => break r,
                        Err(Error::Syscall(_, e))
                            if e.kind() == std::io::ErrorKind::WouldBlock =>
                        {
                            continue
                        }
                        Err(e) => panic!("{e}"),
                    }
                };
                assert_eq!(n, 3);
                assert_eq!(wasfrom, tx_addr);

                let r = rx.join_multicast_group(
                    &Ipv4Addr::LOCALHOST,
                    &Ipv4Addr::UNSPECIFIED,
                ); // Not a mcast addr
                assert!(r.is_err());

                let r = rx.leave_multicast_group(
                    &Ipv4Addr::LOCALHOST,
                    &Ipv4Addr::UNSPECIFIED,
                ); // Not a mcast addr
                assert!(r.is_err());
            });
    }
}
