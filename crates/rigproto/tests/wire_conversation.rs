//! Parse a realistic control-channel transcript end to end.

use pretty_assertions::assert_eq;
use rigproto::{
    describe_reply_code, format_command, next_seq, parse_line, ClientHandle, InboundLine,
    ReplySeverity, StatusScope,
};

const TRANSCRIPT: &[&str] = &[
    "V1.4.0.0",
    "H0x40C82710",
    "R1|0|",
    "R2|0|ANT1,ANT2,XVTA",
    "M10000001|Client connected from IP 192.168.1.10",
    "S0x40C82710|radio slices=4 panadapters=4 lineout_gain=60 lineout_mute=0",
    "S0x40C82710|slice 0x00000000 in_use=1 RF_frequency=14.250000 mode=USB \
     filter_lo=100 filter_hi=2800 rxant=ANT1 txant=ANT1 active=1 lock=0 \
     client_handle=0x40C82710 pan=0x40000000",
    "S0x40C82710|display pan 0x40000000 center=14.100000 bandwidth=0.200000 \
     min_dbm=-135.0 max_dbm=-40.0 x_pixels=1024 y_pixels=300 waterfall=0x42000000",
    "S0x40C82710|display waterfall 0x42000000 panadapter=0x40000000 \
     line_duration=100 color_gain=50 auto_black=1 black_level=0 gradient_index=1",
    "S0x40C82710|meter 0x00000001 src=SLC num=0 nam=LEVEL unit=dBm low=-150.0 hi=20.0 fps=10",
    "R3|50000005|no such object",
    "S0x40C82710|slice 0x00000000 removed=1",
];

#[test]
fn transcript_parses_line_by_line() {
    let parsed: Vec<InboundLine> = TRANSCRIPT
        .iter()
        .map(|line| parse_line(line).unwrap_or_else(|e| panic!("{line:?}: {e}")))
        .collect();

    assert_eq!(parsed[0], InboundLine::Version("1.4.0.0".to_string()));
    assert_eq!(parsed[1], InboundLine::Handle(ClientHandle(0x40C82710)));

    match &parsed[2] {
        InboundLine::Reply(r) => {
            assert_eq!(r.seq, 1);
            assert_eq!(ReplySeverity::from_code(r.code), ReplySeverity::Success);
        }
        other => panic!("expected reply, got {other:?}"),
    }

    match &parsed[4] {
        InboundLine::Notice(n) => {
            assert_eq!(n.code, 0x10000001);
            assert!(n.text.contains("192.168.1.10"));
        }
        other => panic!("expected notice, got {other:?}"),
    }

    let scopes: Vec<&StatusScope> = parsed
        .iter()
        .filter_map(|l| match l {
            InboundLine::Status(s) => Some(&s.scope),
            _ => None,
        })
        .collect();
    assert_eq!(
        scopes,
        vec![
            &StatusScope::Radio,
            &StatusScope::Slice,
            &StatusScope::DisplayPan,
            &StatusScope::DisplayWaterfall,
            &StatusScope::Meter,
            &StatusScope::Slice,
        ]
    );

    match &parsed[10] {
        InboundLine::Reply(r) => {
            assert_eq!(r.seq, 3);
            assert_eq!(describe_reply_code(r.code), "no such object");
            assert!(!ReplySeverity::from_code(r.code).is_accepted());
        }
        other => panic!("expected reply, got {other:?}"),
    }

    match &parsed[11] {
        InboundLine::Status(s) => assert!(s.is_removal()),
        other => panic!("expected status, got {other:?}"),
    }
}

#[test]
fn slice_status_attrs_read_back() {
    let line = TRANSCRIPT[6];
    let InboundLine::Status(status) = parse_line(line).unwrap() else {
        panic!("expected status");
    };
    assert_eq!(status.positional(0), Some("0x00000000"));
    assert_eq!(status.attr("RF_frequency"), Some("14.250000"));
    assert_eq!(status.attr("mode"), Some("USB"));
    assert_eq!(status.attr("pan"), Some("0x40000000"));
    assert_eq!(status.attrs().count(), 11);
}

#[test]
fn command_lines_frame_and_sequence() {
    let mut seq = 0;
    let mut lines = Vec::new();
    for cmd in ["info", "version", "sub slice all", "ping"] {
        seq = next_seq(seq);
        lines.push(format_command(seq, cmd));
    }
    assert_eq!(
        lines,
        vec!["C1|info", "C2|version", "C3|sub slice all", "C4|ping"]
    );
}
