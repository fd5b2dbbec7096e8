#![no_main]

use debug_regs::{
    DebugMode, Extensions, Hart, HartConfig, RegisterView, TableMode, DEFAULT_VLEN,
};
use libfuzzer_sys::fuzz_target;

const DEBUG_MODES: [DebugMode; 4] = [
    DebugMode::None,
    DebugMode::Interrupt,
    DebugMode::Halt,
    DebugMode::Vector,
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 8 {
        return;
    }

    let config = HartConfig {
        extensions: Extensions::from_bits_truncate(u32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ])),
        xlen: if data[4] & 1 == 0 { 32 } else { 64 },
        flen: [0, 32, 64, 16][usize::from(data[4] >> 1 & 3)],
        vlen: DEFAULT_VLEN << (data[5] & 7),
        debug_mode: DEBUG_MODES[usize::from(data[6] & 3)],
    };
    let Ok(mut hart) = Hart::new(config) else {
        return;
    };

    let mode = if data[7] & 1 == 0 {
        TableMode::Full
    } else {
        TableMode::Restricted
    };
    let registers: Vec<_> = hart
        .registers(mode, RegisterView::All)
        .cloned()
        .collect();
    let _ = hart.field_map();

    let payload = &data[8..];
    let mut out = vec![0_u8; 8192];
    for (i, reg) in registers.iter().enumerate() {
        let _ = hart.read_register(reg, &mut out);
        let start = i % payload.len().max(1);
        let _ = hart.write_register(reg, payload.get(start..).unwrap_or_default());
    }

    hart.free_register_info();
    let _ = hart.register_table(mode);
});
