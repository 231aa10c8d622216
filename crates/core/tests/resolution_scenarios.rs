use als2mid_core::{
    normalize_bytes, CandidateSource, ExportPlan, Resolver, SaveReason, ScanConfig, Verdict,
};

fn utf16_le_with_bom(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(text.encode_utf16().flat_map(|unit| unit.to_le_bytes()));
    bytes
}

#[test]
fn utf16_preferences_feed_the_recent_documents_rule() {
    let prefs_bytes = utf16_le_with_bom(
        "\u{1}\u{2}RecentDocsList\u{7}\u{0}FileRef\u{3}D:\\Live Sets\\Night Drive Project\\Night Drive.als\u{5}",
    );
    let log = "\"C:/ProgramData/Ableton/Live 12/Resources/Builtin/Templates/DefaultLiveSet.als\" loaded\n\
               info: Default App: End SavePrefs";

    let resolver = Resolver::default();
    let verdict = resolver.resolve(log, || normalize_bytes(&prefs_bytes));
    let candidate = verdict.candidate().expect("ready verdict");
    assert_eq!(candidate.source(), CandidateSource::Prefs);
    assert_eq!(
        candidate.path(),
        "D:/Live Sets/Night Drive Project/Night Drive.als"
    );

    let plan = ExportPlan::for_project(candidate.path(), &resolver.config().project_extension);
    assert_eq!(plan.folder, "D:/Live Sets/Night Drive Project");
    assert_eq!(plan.output, "D:/Live Sets/Night Drive Project/Night Drive.mid");
}

#[test]
fn spaced_out_preferences_recover_genuine_spaces() {
    // Letters padded by single spaces, real spaces written as runs of padding.
    let prefs = "RecentDocsList\u{1}FileRef\u{1}C : / S e t s / B i g   R o o m / D r o p . a l s";
    let log = "Default App: End SavePrefs";
    let verdict = Resolver::default().resolve(log, || prefs.to_string());
    assert_eq!(
        verdict.candidate().map(|candidate| candidate.path()),
        Some("C:/Sets/Big Room/Drop.als")
    );
}

#[test]
fn custom_configuration_changes_the_patterns() {
    let config = ScanConfig {
        project_extension: ".alp".to_string(),
        default_template: "Blank.alp".to_string(),
        temporary_marker: "Scratch".to_string(),
    };
    let resolver = Resolver::new(config);

    let log = "\"C:/Packs/Builtin/Templates/Blank.alp\" opened";
    assert_eq!(
        resolver.evaluate(log, String::new),
        Verdict::SaveRequired {
            reason: SaveReason::UnsavedDefaultTemplate
        }
    );

    let log = "\"C:/Scratch/Untitled.alp\" opened";
    assert_eq!(
        resolver.resolve(log, String::new),
        Verdict::SaveRequired {
            reason: SaveReason::UnsavedTemporaryOrDefault
        }
    );

    let log = "\"C:/Songs/Real.alp\" opened\n\"C:/Songs/Other.als\" opened";
    assert_eq!(
        resolver
            .resolve(log, String::new)
            .candidate()
            .map(|candidate| candidate.path().to_string()),
        Some("C:/Songs/Real.alp".to_string())
    );
}

#[test]
fn garbage_input_never_panics() {
    let resolver = Resolver::default();
    let samples: [&[u8]; 4] = [
        b"",
        b"\xFF\xFE\x00",
        b"\x00\x00\x00\x00\xFF\xFF\xC3",
        b"C:\\\x00:\x00.als\"\"file:///%",
    ];
    for bytes in samples {
        let text = normalize_bytes(bytes);
        let _ = resolver.evaluate(&text, || text.clone());
        let _ = resolver.prefs_scanner().extract_recent_path(&text);
    }
}
