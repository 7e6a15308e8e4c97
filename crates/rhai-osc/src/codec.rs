//! Argument marshaling between OSC wire types and Rhai values.
//!
//! The send direction is deliberately lenient: a value with no OSC
//! representation is skipped with a warning and the rest of the message is
//! still built. The receive direction is strict: an argument that cannot be
//! decoded aborts delivery of the whole message, because dropping a single
//! argument would change the arity of the callback invocation.

use crate::error::{BridgeError, Result};
use rhai::Dynamic;
use rosc::{OscMessage, OscType};

/// Convert a script value into an OSC argument for sending.
///
/// Reals become 64-bit floats, integers become 32-bit ints and strings are
/// sent as-is. Everything else (booleans, unit, arrays, custom types, and
/// integers outside the 32-bit range) is unsupported on the send path and
/// yields `None`.
pub fn encode_arg(value: &Dynamic) -> Option<OscType> {
    if let Ok(f) = value.as_float() {
        return Some(OscType::Double(f));
    }
    if let Ok(i) = value.as_int() {
        return match i32::try_from(i) {
            Ok(i) => Some(OscType::Int(i)),
            Err(_) => {
                log::warn!("[OSC] integer {} does not fit a 32-bit OSC int, skipped", i);
                None
            }
        };
    }
    if let Ok(s) = value.clone().into_string() {
        return Some(OscType::String(s));
    }
    log::warn!(
        "[OSC] unsupported send argument of type '{}', skipped",
        value.type_name()
    );
    None
}

/// Convert a received OSC argument into a script value.
///
/// Both int widths widen to the script's 64-bit integer and both float
/// widths to its 64-bit float. Nil maps to unit and the infinitum tag to
/// `+inf`. Blob, timetag, color, MIDI and array arguments have no script
/// representation and fail hard.
pub fn decode_arg(arg: &OscType) -> Result<Dynamic> {
    match arg {
        OscType::Int(i) => Ok(Dynamic::from(*i as i64)),
        OscType::Long(h) => Ok(Dynamic::from(*h)),
        OscType::Float(f) => Ok(Dynamic::from(*f as f64)),
        OscType::Double(d) => Ok(Dynamic::from(*d)),
        OscType::String(s) => Ok(Dynamic::from(s.clone())),
        OscType::Char(c) => Ok(Dynamic::from(*c)),
        OscType::Bool(b) => Ok(Dynamic::from(*b)),
        OscType::Nil => Ok(Dynamic::UNIT),
        OscType::Inf => Ok(Dynamic::from(f64::INFINITY)),
        OscType::Blob(_) => Err(BridgeError::UnsupportedWireType('b')),
        OscType::Time(_) => Err(BridgeError::UnsupportedWireType('t')),
        OscType::Color(_) => Err(BridgeError::UnsupportedWireType('r')),
        OscType::Midi(_) => Err(BridgeError::UnsupportedWireType('m')),
        OscType::Array(_) => Err(BridgeError::UnsupportedWireType('[')),
    }
}

/// The type tag character of a received argument, used for dispatch matching.
pub fn wire_tag(arg: &OscType) -> Result<char> {
    match arg {
        OscType::Int(_) => Ok('i'),
        OscType::Long(_) => Ok('h'),
        OscType::Float(_) => Ok('f'),
        OscType::Double(_) => Ok('d'),
        OscType::String(_) => Ok('s'),
        OscType::Char(_) => Ok('c'),
        OscType::Bool(true) => Ok('T'),
        OscType::Bool(false) => Ok('F'),
        OscType::Nil => Ok('N'),
        OscType::Inf => Ok('I'),
        OscType::Blob(_) => Err(BridgeError::UnsupportedWireType('b')),
        OscType::Time(_) => Err(BridgeError::UnsupportedWireType('t')),
        OscType::Color(_) => Err(BridgeError::UnsupportedWireType('r')),
        OscType::Midi(_) => Err(BridgeError::UnsupportedWireType('m')),
        OscType::Array(_) => Err(BridgeError::UnsupportedWireType('[')),
    }
}

/// The type signature of a received argument list.
///
/// Fails if any argument carries an unsupported wire type, so such a
/// message can never match a registered method.
pub fn signature_of(args: &[OscType]) -> Result<String> {
    args.iter().map(wire_tag).collect()
}

/// Validate a registration signature and bring it into canonical form.
///
/// Accepted tags: `s` string, `S` symbol (carried as a string on the wire,
/// so it canonicalizes to `s`), `i` int32, `h` int64, `f` float32,
/// `d` float64, `c` char, `T` true, `F` false, `N` nil, `I` infinitum.
/// An empty signature registers a zero-argument method. Blob (`b`) and
/// timetag (`t`) are rejected as unsupported; any other character is
/// invalid.
pub fn canonical_signature(types: &str) -> Result<String> {
    let mut canonical = String::with_capacity(types.len());
    for c in types.chars() {
        match c {
            's' | 'i' | 'h' | 'f' | 'd' | 'c' | 'T' | 'F' | 'N' | 'I' => canonical.push(c),
            'S' => canonical.push('s'),
            'b' | 't' => return Err(BridgeError::UnsupportedSignatureChar(c)),
            _ => return Err(BridgeError::InvalidSignatureChar(c)),
        }
    }
    Ok(canonical)
}

/// Assemble an outgoing message from a path and an ordered argument list.
///
/// Arguments the codec cannot encode are skipped (see [`encode_arg`]); the
/// remaining arguments keep their original order.
pub fn build_message(path: &str, args: &[Dynamic]) -> OscMessage {
    OscMessage {
        addr: path.into(),
        args: args.iter().filter_map(encode_arg).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_int() {
        let wire = encode_arg(&Dynamic::from(42i64)).unwrap();
        assert_eq!(wire, OscType::Int(42));
        let back = decode_arg(&wire).unwrap();
        assert_eq!(back.as_int().unwrap(), 42);
    }

    #[test]
    fn test_round_trip_float() {
        let wire = encode_arg(&Dynamic::from(3.5f64)).unwrap();
        assert_eq!(wire, OscType::Double(3.5));
        let back = decode_arg(&wire).unwrap();
        assert_eq!(back.as_float().unwrap(), 3.5);
    }

    #[test]
    fn test_round_trip_string() {
        let wire = encode_arg(&Dynamic::from("hello".to_string())).unwrap();
        assert_eq!(wire, OscType::String("hello".into()));
        let back = decode_arg(&wire).unwrap();
        assert_eq!(back.into_string().unwrap(), "hello");
    }

    #[test]
    fn test_decode_widens_small_wire_types() {
        assert_eq!(decode_arg(&OscType::Int(7)).unwrap().as_int().unwrap(), 7);
        assert_eq!(
            decode_arg(&OscType::Long(1 << 40)).unwrap().as_int().unwrap(),
            1 << 40
        );
        assert_eq!(
            decode_arg(&OscType::Float(0.25)).unwrap().as_float().unwrap(),
            0.25
        );
    }

    #[test]
    fn test_decode_special_tags() {
        assert!(decode_arg(&OscType::Bool(true)).unwrap().as_bool().unwrap());
        assert!(!decode_arg(&OscType::Bool(false)).unwrap().as_bool().unwrap());
        assert!(decode_arg(&OscType::Nil).unwrap().is_unit());
        assert_eq!(
            decode_arg(&OscType::Inf).unwrap().as_float().unwrap(),
            f64::INFINITY
        );
        assert_eq!(
            decode_arg(&OscType::Char('x')).unwrap().as_char().unwrap(),
            'x'
        );
    }

    #[test]
    fn test_decode_unsupported_fails() {
        assert!(decode_arg(&OscType::Blob(vec![1, 2, 3])).is_err());
        assert!(decode_arg(&OscType::Time((0, 1).into())).is_err());
    }

    #[test]
    fn test_encode_unsupported_is_skipped() {
        assert!(encode_arg(&Dynamic::from(true)).is_none());
        assert!(encode_arg(&Dynamic::UNIT).is_none());
        assert!(encode_arg(&Dynamic::from(i64::MAX)).is_none());
    }

    #[test]
    fn test_build_message_skips_but_keeps_order() {
        let args = [
            Dynamic::from(3.14f64),
            Dynamic::from(true),
            Dynamic::from("ok".to_string()),
        ];
        let msg = build_message("/mix", &args);
        assert_eq!(msg.addr, "/mix");
        assert_eq!(
            msg.args,
            vec![OscType::Double(3.14), OscType::String("ok".into())]
        );
    }

    #[test]
    fn test_signature_of() {
        let args = vec![OscType::Int(1), OscType::Float(2.0), OscType::Bool(true)];
        assert_eq!(signature_of(&args).unwrap(), "ifT");
        assert!(signature_of(&[OscType::Blob(vec![])]).is_err());
        assert_eq!(signature_of(&[]).unwrap(), "");
    }

    #[test]
    fn test_canonical_signature() {
        assert_eq!(canonical_signature("if").unwrap(), "if");
        assert_eq!(canonical_signature("Sh").unwrap(), "sh");
        assert_eq!(canonical_signature("").unwrap(), "");
        assert!(matches!(
            canonical_signature("ib"),
            Err(BridgeError::UnsupportedSignatureChar('b'))
        ));
        assert!(matches!(
            canonical_signature("t"),
            Err(BridgeError::UnsupportedSignatureChar('t'))
        ));
        assert!(matches!(
            canonical_signature("x"),
            Err(BridgeError::InvalidSignatureChar('x'))
        ));
    }
}
