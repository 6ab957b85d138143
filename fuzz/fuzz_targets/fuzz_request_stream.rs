#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use modbus_slave::clock::ManualClock;
use modbus_slave::constants::{MBAP_HEADER_LEN, RECEIVE_BUFFER_SIZE};
use modbus_slave::decoder::{DecodeStatus, FrameDecoder};
use modbus_slave::processor::{self, Reply};
use modbus_slave::{NoopWatchdog, RegisterStore};

// Arbitrary client byte stream through decoder and processor. Responses must
// stay well-formed whatever the input.
fuzz_target!(|data: &[u8]| {
    let mut store = RegisterStore::new(Arc::new(ManualClock::new(0)));
    for address in 0..16 {
        store.set_u16(1, 3, address, address, 0);
    }

    let mut reader = data;
    let mut decoder = FrameDecoder::new();
    loop {
        match decoder.poll(&mut reader, &mut NoopWatchdog) {
            DecodeStatus::Complete(len) => {
                assert!(len >= MBAP_HEADER_LEN && len <= RECEIVE_BUFFER_SIZE);
                match processor::process(decoder.frame(), &store) {
                    Reply::Data(adu) => assert_eq!(adu.len(), 9 + usize::from(adu[8])),
                    Reply::Exception { adu, .. } => assert_eq!(adu.len(), 9),
                    Reply::Discard => {}
                }
                decoder.reset();
            }
            _ => break,
        }
    }
});
