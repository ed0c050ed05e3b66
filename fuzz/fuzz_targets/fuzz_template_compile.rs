#![no_main]

use fstr_core::{ArgMap, CompileMode, Opcode, compile};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if text.len() > 4096 {
        return;
    }

    // Escapes-only mode never produces placeholders.
    if let Ok(definition) = compile("fuzz", text, CompileMode::EscapesOnly) {
        assert!(definition.placeholders().next().is_none());
        assert!(definition.is_literal());
    }

    let Ok(definition) = compile("fuzz", text, CompileMode::Template) else {
        return;
    };

    // Literal runs are always merged.
    for pair in definition.opcodes().windows(2) {
        assert!(
            !matches!(pair, [Opcode::Literal(_), Opcode::Literal(_)]),
            "adjacent literals in {text:?}"
        );
    }

    // Binding every placeholder to its own name renders without error.
    let mut args = ArgMap::new("fuzz");
    for id in definition.placeholders() {
        args.insert(id.as_str(), id.as_str());
    }
    let rendered = definition.render_to_string(&args).expect("all placeholders bound");

    // Without braces or backslashes the text is its own rendering.
    if !text.contains(['{', '}', '\\']) {
        assert_eq!(rendered, text);
    }
});
