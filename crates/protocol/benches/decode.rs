//! Benchmarks for device-list frame decoding
//!
//! Measures per-frame decode cost for the record types that a large
//! device-list reply is made of.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use protocol::{
    DEVICE_RECORD_SIZE, DeviceRecord, FixedText, InterfaceRecord, OP_REP_DEVLIST, ReplyHeader,
    USBIP_VERSION, decode_device, decode_header, decode_interface, encode_device, encode_header,
    encode_interface,
};

fn bench_device(i: u32) -> DeviceRecord {
    DeviceRecord {
        path: FixedText::from_str_padded(&format!("/sys/devices/platform/usb{}/1-{}", i, i)),
        busid: FixedText::from_str_padded(&format!("1-{}", i)),
        busnum: 1,
        devnum: i,
        speed: 3,
        vendor_id: 0x1234,
        product_id: 0x5678,
        bcd_device: 0x0100,
        device_class: 0x08,
        device_subclass: 0x06,
        device_protocol: 0x50,
        configuration_value: 1,
        num_configurations: 1,
        num_interfaces: 1,
        interfaces: Vec::new(),
    }
}

fn benchmark_single_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_frames");

    let header = encode_header(&ReplyHeader {
        version: USBIP_VERSION,
        code: OP_REP_DEVLIST,
        status: 0,
        device_count: 10,
    });
    group.bench_function("decode_header", |b| {
        b.iter(|| decode_header(black_box(&header)))
    });

    let device = encode_device(&bench_device(1));
    group.throughput(Throughput::Bytes(DEVICE_RECORD_SIZE as u64));
    group.bench_function("decode_device", |b| {
        b.iter(|| decode_device(black_box(&device)))
    });

    let interface = encode_interface(&InterfaceRecord {
        interface_class: 0x08,
        interface_subclass: 0x06,
        interface_protocol: 0x50,
    });
    group.bench_function("decode_interface", |b| {
        b.iter(|| decode_interface(black_box(&interface)))
    });

    group.finish();
}

fn benchmark_device_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_batches");

    for count in [1u32, 16, 128] {
        let frames: Vec<_> = (0..count).map(|i| encode_device(&bench_device(i))).collect();
        group.throughput(Throughput::Bytes(
            (count as usize * DEVICE_RECORD_SIZE) as u64,
        ));
        group.bench_with_input(BenchmarkId::from_parameter(count), &frames, |b, frames| {
            b.iter(|| {
                frames
                    .iter()
                    .map(|f| decode_device(black_box(f)).unwrap())
                    .count()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_single_frames, benchmark_device_batches);
criterion_main!(benches);
