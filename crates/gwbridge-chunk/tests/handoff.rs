use std::sync::mpsc;
use std::thread;

use gwbridge_chunk::{
    collect_message, ChunkChain, ChunkError, ChunkIndex, ChunkPool, ChunkStream, DataStream,
    TransportHeader, CHUNK_PAYLOAD_SIZE, TRANSPORT_HEADER_SIZE,
};

/// Write `message` after the transport header, linking chunks as needed.
fn gateway_message(pool: &ChunkPool, user_data: u64, message: &[u8]) -> ChunkChain {
    let mut chain = ChunkChain::new(pool.acquire().expect("primary chunk"));
    let first = CHUNK_PAYLOAD_SIZE - TRANSPORT_HEADER_SIZE;
    let head = message.len().min(first);
    chain.primary_mut().payload_mut()[TRANSPORT_HEADER_SIZE..TRANSPORT_HEADER_SIZE + head]
        .copy_from_slice(&message[..head]);

    for piece in message[head..].chunks(CHUNK_PAYLOAD_SIZE) {
        let mut next = pool.acquire().expect("extra chunk");
        next.payload_mut()[..piece.len()].copy_from_slice(piece);
        chain.link(next).expect("within chain limit");
    }

    let extra_chunks = chain.extra_count() as u32;
    chain.primary_mut().set_transport_header(&TransportHeader {
        user_data,
        message_len: message.len() as u32,
        extra_chunks,
    });
    chain
}

#[test]
fn gateway_to_host_and_back() {
    let pool = ChunkPool::with_capacity(16);
    let (to_host, host_inbox) = mpsc::channel::<ChunkIndex>();
    let (to_gateway, gateway_inbox) = mpsc::channel::<ChunkIndex>();

    let body: Vec<u8> = (0..1100u32).map(|i| (i % 97) as u8).collect();

    let host_pool = pool.clone();
    let host = thread::spawn(move || {
        let head = host_inbox.recv().expect("request index");
        let request = host_pool.receive_chain(head).expect("well-formed chain");
        let declared = request.primary().transport_header().message_len as usize;

        let mut stream =
            ChunkStream::new(&request, TRANSPORT_HEADER_SIZE, declared).expect("body fits");
        let mut received = Vec::new();
        let mut buf = [0u8; 128];
        loop {
            let n = stream.read_body(&mut buf).expect("body read");
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }

        stream
            .write_response(format!("received {} bytes", received.len()).as_bytes())
            .expect("response write");
        let response = stream.finish().expect("response chain");
        to_gateway
            .send(host_pool.transfer_chain(response))
            .expect("gateway alive");
        request.release();
        received
    });

    let request = gateway_message(&pool, 7, &body);
    assert_eq!(request.len(), 3);
    to_host.send(pool.transfer_chain(request)).expect("host alive");

    let head = gateway_inbox.recv().expect("response index");
    let response = pool.receive_chain(head).expect("response chain");
    assert_eq!(response.primary().transport_header().user_data, 7);
    assert_eq!(collect_message(&response).unwrap(), b"received 1100 bytes");

    assert_eq!(host.join().expect("host thread"), body);
    response.release();

    let stats = pool.stats();
    assert_eq!(stats.free, stats.capacity);
}

#[test]
fn exhaustion_is_distinguishable_from_corruption() {
    let pool = ChunkPool::with_capacity(1);
    let held = pool.acquire().unwrap();

    match pool.acquire() {
        Err(ChunkError::PoolExhausted { capacity }) => assert_eq!(capacity, 1),
        other => panic!("expected exhaustion, got {other:?}"),
    }

    drop(held);
    assert!(pool.acquire().is_ok());
}

#[test]
fn transferred_chunk_cannot_be_claimed_twice() {
    let pool = ChunkPool::with_capacity(2);
    let index = pool.transfer(pool.acquire().unwrap());

    let first = pool.receive(index);
    let second = pool.receive(index);
    assert!(first.is_ok());
    assert!(matches!(second, Err(ChunkError::NotInTransit(_))));
}
