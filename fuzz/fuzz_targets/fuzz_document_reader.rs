#![no_main]

use fstr_doc::DocumentReader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 16 * 1024 {
        return;
    }

    // Reading must never panic, and must stop after the first error.
    let Ok(mut reader) = DocumentReader::new(data) else {
        return;
    };
    let mut sections = 0usize;
    loop {
        match reader.next_section() {
            Ok(Some(section)) => {
                sections += 1;
                for (entry, compiled) in section.definitions() {
                    if let Ok(definition) = compiled {
                        assert_eq!(definition.name(), entry.key);
                    }
                }
            }
            Ok(None) | Err(_) => break,
        }
    }
    assert!(matches!(reader.next_section(), Ok(None)));
    assert!(sections <= data.len());
});
