/* 📖 # Why a printf engine of our own?

The library formats with printf directives and hands over its arguments as a
variadic list. In Rust those arguments arrive as a slice of `FormatArg`
values, so `formatted_write` and `format_to_buffer` need an interpreter for
the directive grammar that works on that slice.

The engine is locale independent and never fails:

- a directive with no argument left renders nothing
- an argument of the wrong kind for its conversion renders nothing
- an unknown conversion is copied to the output verbatim, directive and all
- `%n` consumes its argument and writes nothing

Integer values are truncated to the C width their length modifier implies
(`hh` is 8 bits, `h` 16, none 32, the rest 64), so `%hhu` of 300 prints 44
exactly as the library would see it.
*/

/// One argument for a printf-style directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatArg<'a> {
    Int(i64),
    Uint(u64),
    Float(f64),
    Char(u8),
    Str(&'a str),
    Ptr(usize),
}

impl FormatArg<'_> {
    fn as_i64(self) -> Option<i64> {
        match self {
            FormatArg::Int(value) => Some(value),
            FormatArg::Uint(value) => Some(value as i64),
            FormatArg::Float(value) => Some(value as i64),
            FormatArg::Char(value) => Some(i64::from(value)),
            FormatArg::Ptr(value) => Some(value as i64),
            FormatArg::Str(_) => None,
        }
    }

    fn as_u64(self) -> Option<u64> {
        self.as_i64().map(|value| match self {
            FormatArg::Uint(unsigned) => unsigned,
            _ => value as u64,
        })
    }

    fn as_f64(self) -> Option<f64> {
        match self {
            FormatArg::Float(value) => Some(value),
            FormatArg::Int(value) => Some(value as f64),
            FormatArg::Uint(value) => Some(value as f64),
            FormatArg::Char(value) => Some(f64::from(value)),
            FormatArg::Ptr(_) | FormatArg::Str(_) => None,
        }
    }
}

macro_rules! format_arg_from {
    ($variant:ident as $target:ty: $($source:ty),*) => {
        $(
            impl From<$source> for FormatArg<'_> {
                fn from(value: $source) -> Self {
                    FormatArg::$variant(value as $target)
                }
            }
        )*
    };
}

format_arg_from!(Int as i64: i8, i16, i32, i64, isize);
format_arg_from!(Uint as u64: u16, u32, u64, usize);
format_arg_from!(Float as f64: f32, f64);

impl From<u8> for FormatArg<'_> {
    fn from(value: u8) -> Self {
        FormatArg::Char(value)
    }
}

impl<'a> From<&'a str> for FormatArg<'a> {
    fn from(value: &'a str) -> Self {
        FormatArg::Str(value)
    }
}

impl<'a> From<&'a String> for FormatArg<'a> {
    fn from(value: &'a String) -> Self {
        FormatArg::Str(value.as_str())
    }
}

impl<T> From<*const T> for FormatArg<'_> {
    fn from(value: *const T) -> Self {
        FormatArg::Ptr(value as usize)
    }
}

impl<T> From<*mut T> for FormatArg<'_> {
    fn from(value: *mut T) -> Self {
        FormatArg::Ptr(value as usize)
    }
}

/// Builds a `&[FormatArg]` from plain Rust values.
///
/// ```
/// use iohook_engine::{fmt_args, format_to_vec};
///
/// let line = format_to_vec("%s has %d frames", fmt_args!["kal", 42]);
/// assert_eq!(line, b"kal has 42 frames");
/// ```
#[macro_export]
macro_rules! fmt_args {
    ($($arg:expr),* $(,)?) => {
        &[$($crate::FormatArg::from($arg)),*] as &[$crate::FormatArg<'_>]
    };
}

/// Upper bound on width and precision, so a stray `*` argument cannot
/// request gigabytes of padding.
const MAX_FIELD: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    left: bool,
    plus: bool,
    space: bool,
    alt: bool,
    zero: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Count {
    Absent,
    Fixed(usize),
    FromArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Length {
    Default,
    Char,
    Short,
    Long,
    LongLong,
    IntMax,
    Size,
    PtrDiff,
    LongDouble,
}

impl Length {
    fn truncate_signed(self, value: i64) -> i64 {
        match self {
            Length::Char => i64::from(value as i8),
            Length::Short => i64::from(value as i16),
            Length::Default => i64::from(value as i32),
            _ => value,
        }
    }

    fn truncate_unsigned(self, value: u64) -> u64 {
        match self {
            Length::Char => u64::from(value as u8),
            Length::Short => u64::from(value as u16),
            Length::Default => u64::from(value as u32),
            _ => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Directive {
    flags: Flags,
    width: Count,
    precision: Count,
    length: Length,
    conversion: u8,
}

const CONVERSIONS: &[u8] = b"diuoxXfFeEgGcspn";

#[derive(Debug, PartialEq, Eq)]
enum Segment<'f> {
    Literal(&'f [u8]),
    Directive(Directive),
}

fn parse_count(bytes: &[u8], pos: &mut usize) -> Option<usize> {
    let start = *pos;
    while bytes.get(*pos).is_some_and(u8::is_ascii_digit) {
        *pos += 1;
    }
    (*pos > start).then(|| {
        bytes[start..*pos].iter().fold(0usize, |acc, digit| {
            acc.saturating_mul(10).saturating_add(usize::from(digit - b'0'))
        })
    })
}

/// Parses a directive from the bytes following `%`. Returns the directive
/// and the number of bytes it spans, or `None` if the format ends first.
fn parse_directive(bytes: &[u8]) -> Option<(Directive, usize)> {
    let mut pos = 0;
    let mut flags = Flags::default();
    while let Some(&byte) = bytes.get(pos) {
        match byte {
            b'-' => flags.left = true,
            b'+' => flags.plus = true,
            b' ' => flags.space = true,
            b'#' => flags.alt = true,
            b'0' => flags.zero = true,
            _ => break,
        }
        pos += 1;
    }

    let width = if bytes.get(pos) == Some(&b'*') {
        pos += 1;
        Count::FromArg
    } else {
        parse_count(bytes, &mut pos).map_or(Count::Absent, Count::Fixed)
    };

    let precision = if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        if bytes.get(pos) == Some(&b'*') {
            pos += 1;
            Count::FromArg
        } else {
            Count::Fixed(parse_count(bytes, &mut pos).unwrap_or(0))
        }
    } else {
        Count::Absent
    };

    let (length, skip) = match (bytes.get(pos), bytes.get(pos + 1)) {
        (Some(b'h'), Some(b'h')) => (Length::Char, 2),
        (Some(b'h'), _) => (Length::Short, 1),
        (Some(b'l'), Some(b'l')) => (Length::LongLong, 2),
        (Some(b'l'), _) => (Length::Long, 1),
        (Some(b'j'), _) => (Length::IntMax, 1),
        (Some(b'z'), _) => (Length::Size, 1),
        (Some(b't'), _) => (Length::PtrDiff, 1),
        (Some(b'L'), _) => (Length::LongDouble, 1),
        _ => (Length::Default, 0),
    };
    pos += skip;

    let conversion = *bytes.get(pos)?;
    Some((
        Directive {
            flags,
            width,
            precision,
            length,
            conversion,
        },
        pos + 1,
    ))
}

fn parse_format(format: &[u8]) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut pos = 0;
    while pos < format.len() {
        let start = pos;
        while pos < format.len() && format[pos] != b'%' {
            pos += 1;
        }
        if pos > start {
            segments.push(Segment::Literal(&format[start..pos]));
        }
        if pos == format.len() {
            break;
        }

        let body = &format[pos + 1..];
        if body.first() == Some(&b'%') {
            segments.push(Segment::Literal(b"%"));
            pos += 2;
            continue;
        }
        match parse_directive(body) {
            Some((directive, consumed)) if CONVERSIONS.contains(&directive.conversion) => {
                segments.push(Segment::Directive(directive));
                pos += 1 + consumed;
            }
            Some((_, consumed)) => {
                segments.push(Segment::Literal(&format[pos..pos + 1 + consumed]));
                pos += 1 + consumed;
            }
            None => {
                segments.push(Segment::Literal(&format[pos..]));
                pos = format.len();
            }
        }
    }
    segments
}

/// Directive with `*` fields resolved against the argument list.
#[derive(Debug, Clone, Copy)]
struct Spec {
    flags: Flags,
    width: usize,
    precision: Option<usize>,
    length: Length,
    conversion: u8,
}

struct Args<'s, 'a> {
    args: &'s [FormatArg<'a>],
    next: usize,
}

impl<'a> Args<'_, 'a> {
    fn next(&mut self) -> Option<FormatArg<'a>> {
        let arg = self.args.get(self.next).copied();
        self.next += 1;
        arg
    }
}

fn resolve(directive: &Directive, args: &mut Args<'_, '_>) -> Spec {
    let mut flags = directive.flags;
    let width = match directive.width {
        Count::Absent => 0,
        Count::Fixed(width) => width,
        Count::FromArg => {
            let width = args.next().and_then(FormatArg::as_i64).unwrap_or(0);
            if width < 0 {
                flags.left = true;
            }
            usize::try_from(width.unsigned_abs()).unwrap_or(MAX_FIELD)
        }
    };
    let precision = match directive.precision {
        Count::Absent => None,
        Count::Fixed(precision) => Some(precision),
        // a negative precision argument counts as absent
        Count::FromArg => args
            .next()
            .and_then(FormatArg::as_i64)
            .and_then(|precision| usize::try_from(precision).ok()),
    };
    if flags.plus {
        flags.space = false;
    }
    if flags.left {
        flags.zero = false;
    }
    Spec {
        flags,
        width: width.min(MAX_FIELD),
        precision: precision.map(|precision| precision.min(MAX_FIELD)),
        length: directive.length,
        conversion: directive.conversion,
    }
}

/// Renders `format` with `args` into a new buffer.
pub fn format_to_vec(format: &str, args: &[FormatArg<'_>]) -> Vec<u8> {
    let mut out = Vec::with_capacity(format.len());
    let mut args = Args { args, next: 0 };
    for segment in parse_format(format.as_bytes()) {
        match segment {
            Segment::Literal(bytes) => out.extend_from_slice(bytes),
            Segment::Directive(directive) => {
                let spec = resolve(&directive, &mut args);
                let Some(arg) = args.next() else {
                    continue;
                };
                render(&spec, arg, &mut out);
            }
        }
    }
    out
}

/// Renders into `buffer` with `snprintf` semantics.
///
/// Writes at most `buffer.len() - 1` bytes followed by a NUL terminator
/// (nothing at all for an empty buffer) and returns the length of the full
/// rendering, so a return value `>= buffer.len()` means the output was
/// truncated.
pub fn format_to_buffer(buffer: &mut [u8], format: &str, args: &[FormatArg<'_>]) -> usize {
    let rendered = format_to_vec(format, args);
    if let Some(capacity) = buffer.len().checked_sub(1) {
        let copied = rendered.len().min(capacity);
        buffer[..copied].copy_from_slice(&rendered[..copied]);
        buffer[copied] = 0;
    }
    rendered.len()
}

fn render(spec: &Spec, arg: FormatArg<'_>, out: &mut Vec<u8>) {
    match spec.conversion {
        b'd' | b'i' => {
            if let Some(value) = arg.as_i64() {
                render_signed(spec.length.truncate_signed(value), spec, out);
            }
        }
        b'u' | b'o' | b'x' | b'X' => {
            if let Some(value) = arg.as_u64() {
                render_unsigned(spec.length.truncate_unsigned(value), spec, out);
            }
        }
        b'f' | b'F' | b'e' | b'E' | b'g' | b'G' => {
            if let Some(value) = arg.as_f64() {
                render_float(value, spec, out);
            }
        }
        b'c' => {
            if let Some(value) = arg.as_i64() {
                pad_field(&[value as u8], spec, out);
            }
        }
        b's' => {
            if let FormatArg::Str(text) = arg {
                let bytes = text.as_bytes();
                let shown = spec.precision.map_or(bytes.len(), |max| max.min(bytes.len()));
                pad_field(&bytes[..shown], spec, out);
            }
        }
        b'p' => {
            if let Some(address) = arg.as_u64() {
                if address == 0 {
                    pad_field(b"(nil)", spec, out);
                } else {
                    let text = format!("0x{:x}", address);
                    pad_field(text.as_bytes(), spec, out);
                }
            }
        }
        _ => {}
    }
}

/// Space pads `body` to the field width.
fn pad_field(body: &[u8], spec: &Spec, out: &mut Vec<u8>) {
    let padding = spec.width.saturating_sub(body.len());
    if !spec.flags.left {
        out.resize(out.len() + padding, b' ');
    }
    out.extend_from_slice(body);
    if spec.flags.left {
        out.resize(out.len() + padding, b' ');
    }
}

/// Emits `sign`, `prefix` and `digits` in a field, zero padding between the
/// prefix and the digits when `zero_pad` is set.
fn emit_number(
    sign: &str,
    prefix: &str,
    digits: &str,
    zero_pad: bool,
    spec: &Spec,
    out: &mut Vec<u8>,
) {
    let content = sign.len() + prefix.len() + digits.len();
    let padding = spec.width.saturating_sub(content);
    if !spec.flags.left && !zero_pad {
        out.resize(out.len() + padding, b' ');
    }
    out.extend_from_slice(sign.as_bytes());
    out.extend_from_slice(prefix.as_bytes());
    if zero_pad {
        out.resize(out.len() + padding, b'0');
    }
    out.extend_from_slice(digits.as_bytes());
    if spec.flags.left {
        out.resize(out.len() + padding, b' ');
    }
}

fn sign_for(negative: bool, flags: Flags) -> &'static str {
    if negative {
        "-"
    } else if flags.plus {
        "+"
    } else if flags.space {
        " "
    } else {
        ""
    }
}

/// Applies integer precision: minimum digit count, and no digits at all for
/// a zero value with precision 0.
fn integer_digits(digits: String, is_zero: bool, precision: Option<usize>) -> String {
    match precision {
        Some(0) if is_zero => String::new(),
        Some(min) if digits.len() < min => format!("{}{}", "0".repeat(min - digits.len()), digits),
        _ => digits,
    }
}

fn render_signed(value: i64, spec: &Spec, out: &mut Vec<u8>) {
    let digits = integer_digits(value.unsigned_abs().to_string(), value == 0, spec.precision);
    let zero_pad = spec.flags.zero && spec.precision.is_none();
    emit_number(sign_for(value < 0, spec.flags), "", &digits, zero_pad, spec, out);
}

fn render_unsigned(value: u64, spec: &Spec, out: &mut Vec<u8>) {
    let raw = match spec.conversion {
        b'o' => format!("{:o}", value),
        b'x' => format!("{:x}", value),
        b'X' => format!("{:X}", value),
        _ => value.to_string(),
    };
    let mut digits = integer_digits(raw, value == 0, spec.precision);
    let prefix = match spec.conversion {
        // octal alternate form only guarantees a leading zero
        b'o' if spec.flags.alt && !digits.starts_with('0') => {
            digits.insert(0, '0');
            ""
        }
        b'x' if spec.flags.alt && value != 0 => "0x",
        b'X' if spec.flags.alt && value != 0 => "0X",
        _ => "",
    };
    let zero_pad = spec.flags.zero && spec.precision.is_none();
    emit_number("", prefix, &digits, zero_pad, spec, out);
}

fn render_float(value: f64, spec: &Spec, out: &mut Vec<u8>) {
    let upper = spec.conversion.is_ascii_uppercase();
    let sign = sign_for(value.is_sign_negative() && !value.is_nan(), spec.flags);
    if !value.is_finite() {
        let body = match (value.is_nan(), upper) {
            (true, false) => "nan",
            (true, true) => "NAN",
            (false, false) => "inf",
            (false, true) => "INF",
        };
        emit_number(sign, "", body, false, spec, out);
        return;
    }

    let precision = spec.precision.unwrap_or(6);
    let magnitude = value.abs();
    let body = match spec.conversion {
        b'f' | b'F' => fixed(magnitude, precision, spec.flags.alt),
        b'e' | b'E' => exponent(magnitude, precision, upper, spec.flags.alt),
        _ => general(magnitude, precision, upper, spec.flags.alt),
    };
    emit_number(sign, "", &body, spec.flags.zero, spec, out);
}

fn fixed(magnitude: f64, precision: usize, alt: bool) -> String {
    let mut text = format!("{:.*}", precision, magnitude);
    if alt && precision == 0 {
        text.push('.');
    }
    text
}

/// Splits Rust's `{:e}` rendering into mantissa and decimal exponent.
fn split_exponent(magnitude: f64, precision: usize) -> (String, i32) {
    let text = format!("{:.*e}", precision, magnitude);
    match text.split_once('e') {
        Some((mantissa, exp)) => (mantissa.to_string(), exp.parse().unwrap_or(0)),
        None => (text, 0),
    }
}

fn exponent(magnitude: f64, precision: usize, upper: bool, alt: bool) -> String {
    let (mut mantissa, exp) = split_exponent(magnitude, precision);
    if alt && precision == 0 {
        mantissa.push('.');
    }
    let marker = if upper { 'E' } else { 'e' };
    let exp_sign = if exp < 0 { '-' } else { '+' };
    format!("{}{}{}{:02}", mantissa, marker, exp_sign, exp.unsigned_abs())
}

fn strip_fraction_zeros(text: &mut String) {
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
}

fn general(magnitude: f64, precision: usize, upper: bool, alt: bool) -> String {
    let significant = precision.max(1);
    let (_, exp) = split_exponent(magnitude, significant - 1);
    let use_fixed = exp >= -4 && i64::from(exp) < significant as i64;
    if use_fixed {
        let decimals = usize::try_from(significant as i64 - 1 - i64::from(exp)).unwrap_or(0);
        let mut text = fixed(magnitude, decimals, alt);
        if !alt {
            strip_fraction_zeros(&mut text);
        }
        text
    } else {
        let text = exponent(magnitude, significant - 1, upper, alt);
        if alt {
            return text;
        }
        let marker = if upper { 'E' } else { 'e' };
        match text.split_once(marker) {
            Some((mantissa, exp)) => {
                let mut mantissa = mantissa.to_string();
                strip_fraction_zeros(&mut mantissa);
                format!("{}{}{}", mantissa, marker, exp)
            }
            None => text,
        }
    }
}
