/// How a request's `Range` header resolves against a file of known size.
///
/// A missing or malformed header falls back to serving the whole file, which
/// keeps broken clients playing instead of handing them an invalid byte
/// window. Only a syntactically valid range that lies entirely beyond the end
/// of the file is unsatisfiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    Full,
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

pub fn resolve_range(header: Option<&str>, size: u64) -> RangeSpec {
    let Some(value) = header else {
        return RangeSpec::Full;
    };
    let Some(range) = value.trim().strip_prefix("bytes=") else {
        return RangeSpec::Full;
    };
    if range.contains(',') {
        // Multipart ranges are not supported; serve everything.
        return RangeSpec::Full;
    }
    if size == 0 {
        return RangeSpec::Unsatisfiable;
    }

    // Suffix form: the last N bytes.
    if let Some(suffix) = range.strip_prefix('-') {
        let Ok(suffix) = suffix.trim().parse::<u64>() else {
            return RangeSpec::Full;
        };
        if suffix == 0 {
            return RangeSpec::Unsatisfiable;
        }
        let start = size.saturating_sub(suffix);
        return RangeSpec::Partial {
            start,
            end: size - 1,
        };
    }

    let mut parts = range.splitn(2, '-');
    let start_str = parts.next().unwrap_or("").trim();
    let end_str = parts.next().unwrap_or("").trim();

    let Ok(start) = start_str.parse::<u64>() else {
        return RangeSpec::Full;
    };
    if start >= size {
        return RangeSpec::Unsatisfiable;
    }

    let end = if end_str.is_empty() {
        size - 1
    } else {
        match end_str.parse::<u64>() {
            // An end before the start is malformed, not unsatisfiable.
            Ok(end) if end < start => return RangeSpec::Full,
            Ok(end) => end.min(size - 1),
            Err(_) => return RangeSpec::Full,
        }
    };

    RangeSpec::Partial { start, end }
}
