/// IUPAC complement; gap characters map to themselves, unknowns to 'N'.
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        b'M' => b'K',
        b'R' => b'Y',
        b'W' => b'W',
        b'S' => b'S',
        b'Y' => b'R',
        b'K' => b'M',
        b'V' => b'B',
        b'H' => b'D',
        b'D' => b'H',
        b'B' => b'V',
        b'-' => b'-',
        b'*' => b'*',
        _ => b'N',
    }
}

pub fn reverse_complement(seq: &mut String) {
    let rc: String = seq
        .bytes()
        .rev()
        .map(|b| complement(b) as char)
        .collect();
    *seq = rc;
}

pub fn reverse_complemented(seq: &str) -> String {
    let mut s = seq.to_string();
    reverse_complement(&mut s);
    s
}

/// Reverse complement preserving case, for pulse-call strings where
/// lowercase marks squashed pulses.
pub fn reverse_complement_case_sensitive(seq: &mut String) {
    let rc: String = seq
        .bytes()
        .rev()
        .map(|b| {
            let c = complement(b);
            if b.is_ascii_lowercase() {
                c.to_ascii_lowercase() as char
            } else {
                c as char
            }
        })
        .collect();
    *seq = rc;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement() {
        assert_eq!(complement(b'A'), b'T');
        assert_eq!(complement(b'g'), b'C');
        assert_eq!(complement(b'-'), b'-');
        assert_eq!(complement(b'*'), b'*');
        assert_eq!(complement(b'Q'), b'N');
    }

    #[test]
    fn test_reverse_complement() {
        let mut s = String::from("ACGT");
        reverse_complement(&mut s);
        assert_eq!(s, "ACGT");

        let mut s = String::from("AACG");
        reverse_complement(&mut s);
        assert_eq!(s, "CGTT");
    }

    #[test]
    fn test_case_sensitive() {
        let mut s = String::from("AcgT");
        reverse_complement_case_sensitive(&mut s);
        assert_eq!(s, "AcgT");

        let mut s = String::from("aACG");
        reverse_complement_case_sensitive(&mut s);
        assert_eq!(s, "CGTt");
    }
}
