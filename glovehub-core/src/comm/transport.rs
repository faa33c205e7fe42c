//! Timer-driven link service
//!
//! [`Transport::service`] is the body of the periodic comm tick. It is the
//! only code that talks to the [`SerialLink`]; mainline code only ever sees
//! the two ring buffers.
//!
//! RX: everything the link has buffered is taken as one batch, or the whole
//! batch is dropped when the RX ring cannot hold it. A partial ingest would
//! cut a frame in a place the decoder cannot detect.
//!
//! TX: at most one packet per tick. On packet links a full-size packet is
//! followed by a zero-length packet to close the transfer. A link that
//! keeps refusing packets gets its backlog discarded after
//! [`MAX_TX_REJECTS`] consecutive refusals.

use glovehub_hal::{LinkKind, SerialLink};

use crate::ring_buffer::RingBuffer;

/// Largest packet the transport moves per tick (USB full-speed bulk size)
pub const MAX_PACKET_SIZE: usize = 64;

/// Consecutive TX refusals tolerated before the backlog is discarded
pub const MAX_TX_REJECTS: u8 = 8;

/// Default comm tick frequency
pub const DEFAULT_COMM_INTERRUPT_HZ: u32 = 2000;

/// Running totals kept by the transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransportStats {
    /// Bytes moved from the link into the RX ring
    pub rx_bytes: u32,
    /// Bytes drained from the link and discarded (RX ring too full)
    pub rx_dropped_bytes: u32,
    /// Bytes accepted by the link
    pub tx_bytes: u32,
    /// Packets accepted by the link, zero-length ones included
    pub tx_packets: u32,
    /// Zero-length packets sent
    pub zero_length_packets: u32,
    /// Ticks on which the link refused a packet
    pub tx_rejects: u32,
    /// Times the TX backlog was discarded
    pub tx_backlog_drops: u32,
}

/// Link service state owned by the comm tick
pub struct Transport<L> {
    link: L,
    zlp_pending: bool,
    rejects: u8,
    stats: TransportStats,
    scratch: [u8; MAX_PACKET_SIZE],
}

impl<L: SerialLink> Transport<L> {
    /// Create a transport servicing `link`
    pub fn new(link: L) -> Self {
        Self {
            link,
            zlp_pending: false,
            rejects: 0,
            stats: TransportStats::default(),
            scratch: [0; MAX_PACKET_SIZE],
        }
    }

    /// Access the serviced link
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Totals since start-up
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Current run of consecutive TX refusals
    pub fn reject_count(&self) -> u8 {
        self.rejects
    }

    /// Whether a zero-length packet is owed to the link
    pub fn zlp_pending(&self) -> bool {
        self.zlp_pending
    }

    /// One comm tick: RX phase, then TX phase
    ///
    /// Must run with both buffers locked against mainline access.
    pub fn service<const RX: usize, const TX: usize>(
        &mut self,
        rx: &mut RingBuffer<RX>,
        tx: &mut RingBuffer<TX>,
    ) {
        self.service_rx(rx);
        self.service_tx(tx);
    }

    fn service_rx<const N: usize>(&mut self, rx: &mut RingBuffer<N>) {
        let available = self.link.rx_available();
        if available == 0 {
            return;
        }

        let keep = available <= rx.bytes_free();
        let mut remaining = available;
        while remaining > 0 {
            let chunk = remaining.min(MAX_PACKET_SIZE);
            let n = self.link.read(&mut self.scratch[..chunk]);
            if n == 0 {
                break;
            }
            remaining -= n.min(remaining);

            if keep && rx.enqueue(&self.scratch[..n]).is_ok() {
                self.stats.rx_bytes = self.stats.rx_bytes.wrapping_add(n as u32);
            } else {
                self.stats.rx_dropped_bytes = self.stats.rx_dropped_bytes.wrapping_add(n as u32);
            }
        }
    }

    fn service_tx<const N: usize>(&mut self, tx: &mut RingBuffer<N>) {
        if tx.is_empty() && !self.zlp_pending {
            return;
        }

        let link_packet = self.link.max_packet_size();
        let count = tx.bytes_used().min(link_packet).min(MAX_PACKET_SIZE);

        let sent = self.link.tx_ready()
            && tx.peek_into(&mut self.scratch[..count]).is_ok()
            && self.link.send(&self.scratch[..count]).is_ok();

        if sent {
            tx.remove_from_tail(count);
            self.rejects = 0;
            // Only a packet of the link's own maximum size leaves the transfer open
            self.zlp_pending = self.link.kind() == LinkKind::Packet && count == link_packet;

            self.stats.tx_bytes = self.stats.tx_bytes.wrapping_add(count as u32);
            self.stats.tx_packets = self.stats.tx_packets.wrapping_add(1);
            if count == 0 {
                self.stats.zero_length_packets = self.stats.zero_length_packets.wrapping_add(1);
            }
            return;
        }

        self.rejects += 1;
        self.stats.tx_rejects = self.stats.tx_rejects.wrapping_add(1);
        if self.rejects > MAX_TX_REJECTS {
            tx.reset();
            self.rejects = 0;
            self.stats.tx_backlog_drops = self.stats.tx_backlog_drops.wrapping_add(1);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::vec::Vec;

    /// Scriptable link: queued RX bytes, recorded TX packets
    pub(crate) struct MockLink {
        pub kind: LinkKind,
        pub max_packet: usize,
        pub incoming: Vec<u8>,
        pub ready: bool,
        pub refuse_send: bool,
        pub packets: Vec<Vec<u8>>,
    }

    impl MockLink {
        pub fn new(kind: LinkKind, max_packet: usize) -> Self {
            Self {
                kind,
                max_packet,
                incoming: Vec::new(),
                ready: true,
                refuse_send: false,
                packets: Vec::new(),
            }
        }

        pub fn sent_bytes(&self) -> Vec<u8> {
            self.packets.concat()
        }
    }

    impl SerialLink for MockLink {
        type Error = ();

        fn kind(&self) -> LinkKind {
            self.kind
        }

        fn max_packet_size(&self) -> usize {
            self.max_packet
        }

        fn rx_available(&mut self) -> usize {
            self.incoming.len()
        }

        fn read(&mut self, buf: &mut [u8]) -> usize {
            let n = buf.len().min(self.incoming.len());
            buf[..n].copy_from_slice(&self.incoming[..n]);
            self.incoming.drain(..n);
            n
        }

        fn tx_ready(&mut self) -> bool {
            self.ready
        }

        fn send(&mut self, packet: &[u8]) -> Result<(), ()> {
            if self.refuse_send {
                return Err(());
            }
            self.packets.push(packet.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_rx_batch_ingested_whole() {
        let mut link = MockLink::new(LinkKind::Stream, 32);
        link.incoming.extend_from_slice(&[1, 2, 3, 4, 5]);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<8>::new();

        transport.service(&mut rx, &mut tx);

        assert_eq!(rx.bytes_used(), 5);
        assert_eq!(rx.peek(4), Some(5));
        assert_eq!(transport.stats().rx_bytes, 5);
        assert!(transport.link_mut().incoming.is_empty());
    }

    #[test]
    fn test_rx_batch_larger_than_free_space_is_dropped() {
        let mut link = MockLink::new(LinkKind::Stream, 32);
        link.incoming.extend_from_slice(&[9; 6]);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        rx.enqueue(&[1, 2, 3]).unwrap();
        let mut tx = RingBuffer::<8>::new();

        transport.service(&mut rx, &mut tx);

        // Nothing of the batch got in, and the link was drained
        assert_eq!(rx.bytes_used(), 3);
        assert_eq!(rx.peek(2), Some(3));
        assert_eq!(transport.stats().rx_dropped_bytes, 6);
        assert!(transport.link_mut().incoming.is_empty());
    }

    #[test]
    fn test_rx_exactly_free_space_fits() {
        let mut link = MockLink::new(LinkKind::Stream, 32);
        link.incoming.extend_from_slice(&[7; 4]);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<4>::new();
        let mut tx = RingBuffer::<4>::new();

        transport.service(&mut rx, &mut tx);
        assert!(rx.is_full());
    }

    #[test]
    fn test_rx_batch_spanning_several_scratch_chunks() {
        let mut link = MockLink::new(LinkKind::Stream, 32);
        link.incoming.extend(0..150u8);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<200>::new();
        let mut tx = RingBuffer::<4>::new();

        transport.service(&mut rx, &mut tx);
        assert_eq!(rx.bytes_used(), 150);
        assert_eq!(rx.peek(149), Some(149));
    }

    #[test]
    fn test_tx_sends_at_most_one_packet_per_tick() {
        let link = MockLink::new(LinkKind::Stream, 4);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<16>::new();
        tx.enqueue(&[1, 2, 3, 4, 5, 6]).unwrap();

        transport.service(&mut rx, &mut tx);
        assert_eq!(transport.link_mut().packets, vec![vec![1, 2, 3, 4]]);
        assert_eq!(tx.bytes_used(), 2);

        transport.service(&mut rx, &mut tx);
        assert_eq!(transport.link_mut().packets[1], vec![5, 6]);
        assert!(tx.is_empty());

        // Stream links never owe a ZLP
        assert!(!transport.zlp_pending());
        transport.service(&mut rx, &mut tx);
        assert_eq!(transport.link_mut().packets.len(), 2);
    }

    #[test]
    fn test_full_packet_is_followed_by_zlp() {
        let link = MockLink::new(LinkKind::Packet, 4);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<16>::new();
        tx.enqueue(&[1, 2, 3, 4]).unwrap();

        transport.service(&mut rx, &mut tx);
        assert!(transport.zlp_pending());

        // Buffer is empty but the ZLP still goes out
        transport.service(&mut rx, &mut tx);
        assert_eq!(transport.link_mut().packets, vec![vec![1, 2, 3, 4], vec![]]);
        assert!(!transport.zlp_pending());
        assert_eq!(transport.stats().zero_length_packets, 1);

        transport.service(&mut rx, &mut tx);
        assert_eq!(transport.link_mut().packets.len(), 2);
    }

    #[test]
    fn test_scratch_sized_packet_on_wide_link_needs_no_zlp() {
        // 64 bytes is a full scratch buffer but a short packet on this link
        let link = MockLink::new(LinkKind::Packet, 512);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<128>::new();
        tx.enqueue(&[0x33; MAX_PACKET_SIZE]).unwrap();

        transport.service(&mut rx, &mut tx);
        assert!(!transport.zlp_pending());
        transport.service(&mut rx, &mut tx);

        let sizes: Vec<usize> = transport.link_mut().packets.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![MAX_PACKET_SIZE]);
        assert_eq!(transport.stats().zero_length_packets, 0);
    }

    #[test]
    fn test_short_packet_needs_no_zlp() {
        let link = MockLink::new(LinkKind::Packet, 4);
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<16>::new();
        tx.enqueue(&[1, 2, 3]).unwrap();

        transport.service(&mut rx, &mut tx);
        assert!(!transport.zlp_pending());
    }

    #[test]
    fn test_refused_packet_stays_buffered() {
        let mut link = MockLink::new(LinkKind::Stream, 8);
        link.refuse_send = true;
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<16>::new();
        tx.enqueue(&[1, 2, 3]).unwrap();

        transport.service(&mut rx, &mut tx);
        assert_eq!(tx.bytes_used(), 3);
        assert_eq!(transport.reject_count(), 1);

        transport.link_mut().refuse_send = false;
        transport.service(&mut rx, &mut tx);
        assert!(tx.is_empty());
        assert_eq!(transport.reject_count(), 0);
        assert_eq!(transport.link_mut().sent_bytes(), vec![1, 2, 3]);
    }

    #[test]
    fn test_backlog_dropped_after_nine_rejects() {
        let mut link = MockLink::new(LinkKind::Packet, 64);
        link.ready = false;
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<128>::new();
        tx.enqueue(&[0x55; 100]).unwrap();

        for n in 1..=8u8 {
            transport.service(&mut rx, &mut tx);
            assert_eq!(transport.reject_count(), n);
            assert_eq!(tx.bytes_used(), 100);
        }

        transport.service(&mut rx, &mut tx);
        assert!(tx.is_empty());
        assert_eq!(transport.reject_count(), 0);
        assert_eq!(transport.stats().tx_backlog_drops, 1);
        assert_eq!(transport.stats().tx_rejects, 9);
        assert!(transport.link_mut().packets.is_empty());
    }

    #[test]
    fn test_idle_link_does_not_count_rejects() {
        let mut link = MockLink::new(LinkKind::Stream, 8);
        link.ready = false;
        let mut transport = Transport::new(link);
        let mut rx = RingBuffer::<8>::new();
        let mut tx = RingBuffer::<8>::new();

        for _ in 0..20 {
            transport.service(&mut rx, &mut tx);
        }
        assert_eq!(transport.reject_count(), 0);
        assert_eq!(transport.stats().tx_rejects, 0);
    }
}
