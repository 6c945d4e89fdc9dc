//! The PacBio per-record tag inventory.

/// Every tag a PacBio record may carry, plus the faux `Seq`/`Qual` entries
/// that route to the fixed record sections instead of the tag block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecordTag {
    AltLabelQv,
    AltLabelTag,
    BarcodeQuality,
    Barcodes,
    ContextFlags,
    DeletionQv,
    DeletionTag,
    HoleNumber,
    InsertionQv,
    Ipd,
    LabelQv,
    LongCigar,
    MergeQv,
    NumPasses,
    Pkmean,
    Pkmean2,
    Pkmid,
    Pkmid2,
    PrePulseFrames,
    PulseCall,
    PulseCallWidth,
    PulseExclusion,
    PulseMergeQv,
    PulseWidth,
    QueryEnd,
    QueryStart,
    ReadAccuracy,
    ReadGroup,
    ScrapRegionType,
    ScrapZmwType,
    SignalToNoise,
    StartFrame,
    SubstitutionQv,
    SubstitutionTag,
    // faux tags, resolved against the fixed sections
    Seq,
    Qual,
}

impl RecordTag {
    /// Two-character wire label.
    pub fn label(&self) -> &'static str {
        match self {
            RecordTag::AltLabelQv => "pv",
            RecordTag::AltLabelTag => "pt",
            RecordTag::BarcodeQuality => "bq",
            RecordTag::Barcodes => "bc",
            RecordTag::ContextFlags => "cx",
            RecordTag::DeletionQv => "dq",
            RecordTag::DeletionTag => "dt",
            RecordTag::HoleNumber => "zm",
            RecordTag::InsertionQv => "iq",
            RecordTag::Ipd => "ip",
            RecordTag::LabelQv => "pq",
            RecordTag::LongCigar => "CG",
            RecordTag::MergeQv => "mq",
            RecordTag::NumPasses => "np",
            RecordTag::Pkmean => "pa",
            RecordTag::Pkmean2 => "ps",
            RecordTag::Pkmid => "pm",
            RecordTag::Pkmid2 => "pi",
            RecordTag::PrePulseFrames => "pd",
            RecordTag::PulseCall => "pc",
            RecordTag::PulseCallWidth => "px",
            RecordTag::PulseExclusion => "pe",
            RecordTag::PulseMergeQv => "pg",
            RecordTag::PulseWidth => "pw",
            RecordTag::QueryEnd => "qe",
            RecordTag::QueryStart => "qs",
            RecordTag::ReadAccuracy => "rq",
            RecordTag::ReadGroup => "RG",
            RecordTag::ScrapRegionType => "sc",
            RecordTag::ScrapZmwType => "sz",
            RecordTag::SignalToNoise => "sn",
            RecordTag::StartFrame => "sf",
            RecordTag::SubstitutionQv => "sq",
            RecordTag::SubstitutionTag => "st",
            RecordTag::Seq | RecordTag::Qual => "",
        }
    }

    /// Whether the tag's array length runs per-pulse rather than per-base.
    pub fn is_pulse(&self) -> bool {
        matches!(
            self,
            RecordTag::AltLabelQv
                | RecordTag::AltLabelTag
                | RecordTag::LabelQv
                | RecordTag::Pkmean
                | RecordTag::Pkmean2
                | RecordTag::Pkmid
                | RecordTag::Pkmid2
                | RecordTag::PrePulseFrames
                | RecordTag::PulseCall
                | RecordTag::PulseCallWidth
                | RecordTag::PulseExclusion
                | RecordTag::PulseMergeQv
                | RecordTag::StartFrame
        )
        // 'pw' has "pulse" in the name but is stored per-base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(RecordTag::HoleNumber.label(), "zm");
        assert_eq!(RecordTag::ReadGroup.label(), "RG");
        assert_eq!(RecordTag::LongCigar.label(), "CG");
    }

    #[test]
    fn test_pulse_classification() {
        assert!(RecordTag::PulseCall.is_pulse());
        assert!(RecordTag::StartFrame.is_pulse());
        assert!(!RecordTag::PulseWidth.is_pulse());
        assert!(!RecordTag::Ipd.is_pulse());
        assert!(!RecordTag::QueryStart.is_pulse());
    }
}
