use std::sync::Arc;

use pulse_bam::record::PHOTON_FACTOR;
use pulse_bam::{
    codec, sam, BamHeader, BamRecord, ClipType, FrameCodec, Orientation, PulseBehavior,
    RecordBuilder, RecordType, Tag, TagCollection, TagModifier, Validator,
};

fn sample_header() -> Arc<BamHeader> {
    let text = "@HD\tVN:1.5\tSO:coordinate\tpb:3.0.1\n\
        @SQ\tSN:chr1\tLN:25000\n\
        @RG\tID:3f58e5b8\tPL:PACBIO\tDS:READTYPE=SUBREAD;DeletionQV=dq;Ipd:CodecV1=ip;\
BINDINGKIT=100-619-300;SEQUENCINGKIT=100-867-300;BASECALLERVERSION=3.1;FRAMERATEHZ=100\t\
PU:movie1\tPM:SEQUEL";
    Arc::new(BamHeader::from_sam(text).unwrap())
}

#[test]
fn record_lifecycle_through_wire() {
    let header = sample_header();
    let mut builder = RecordBuilder::with_header(header.clone());
    builder
        .name("movie1/8/0_10")
        .sequence("AATGAGGAGA")
        .qualities("IIIIIIIIII")
        .cigar("10=".parse().unwrap())
        .reference_id(0)
        .position(100)
        .map_quality(60)
        .set_mapped(true)
        .tag("RG", Tag::from("3f58e5b8"))
        .tag("zm", Tag::from(8i32))
        .tag("qs", Tag::from(0i32))
        .tag("qe", Tag::from(10i32));
    let record = builder.build().unwrap();

    let wire = record.raw().to_wire();
    let reparsed = pulse_bam::RawRecord::from_wire(&wire).unwrap();
    let reparsed = BamRecord::from_raw_with_header(reparsed, header);

    assert_eq!(reparsed, record);
    assert_eq!(reparsed.record_type(), RecordType::Subread);
    assert_eq!(reparsed.movie_name().unwrap(), "movie1");
    assert_eq!(reparsed.hole_number().unwrap(), 8);
    assert_eq!(reparsed.reference_name().unwrap(), "chr1");
    assert_eq!(
        reparsed.read_group().unwrap().ipd_codec(),
        FrameCodec::V1
    );
}

#[test]
fn clip_then_validate() {
    let header = sample_header();
    let mut builder = RecordBuilder::with_header(header);
    builder
        .name("movie1/42/0_10")
        .sequence("ACGTACGTAC")
        .qualities("!!!!!!!!!!")
        .cigar("10=".parse().unwrap())
        .reference_id(0)
        .position(100)
        .set_mapped(true)
        .tag("RG", Tag::from("3f58e5b8"))
        .tag("zm", Tag::from(42i32))
        .tag("np", Tag::from(1i32))
        .tag("qs", Tag::from(0i32))
        .tag("qe", Tag::from(10i32))
        .tag("dq", Tag::from("2222'$22'2"));
    let mut record = builder.build().unwrap();

    assert!(Validator::validate_record(&record, 0).is_ok());

    record.clip(ClipType::ClipToQuery, 2, 8, false).unwrap();
    assert_eq!(
        record.sequence(Orientation::Native, false, false).unwrap(),
        "GTACGT"
    );
    assert_eq!(record.reference_start(), 102);
    assert_eq!(record.query_start().unwrap(), 2);
    assert_eq!(record.query_end().unwrap(), 8);

    // still internally consistent after the clip
    assert!(Validator::validate_record(&record, 0).is_ok());
}

#[test]
fn binary_and_sam_codecs_agree() {
    let mut tags = TagCollection::new();
    tags.insert(
        "HX".to_string(),
        Tag::with_modifier("1abc75", TagModifier::HexString).unwrap(),
    );
    tags.insert("CA".to_string(), Tag::from(vec![34u8, 5, 125]));
    tags.insert("XY".to_string(), Tag::from(-42i32));

    let binary = codec::encode_tags(&tags).unwrap();
    let text = sam::encode_sam_tags(&tags).unwrap();
    assert_eq!(text, "CA:B:C,34,5,125\tHX:H:1abc75\tXY:i:-42");

    let from_binary = codec::decode_tags(&binary).unwrap();
    let from_text = sam::decode_sam_tags(&text).unwrap();
    assert_eq!(from_binary, tags);
    // SAM text widens integer widths at most; this collection is narrow
    // enough to survive exactly
    assert_eq!(sam::encode_sam_tags(&from_text).unwrap(), text);
}

#[test]
fn pulse_data_over_clip_and_projection() {
    let mut record = BamRecord::new();
    {
        let raw = record.raw_mut();
        raw.set_name("m/7/0_4").unwrap();
        raw.set_mapped(true);
        raw.set_reference_id(0);
        raw.set_position(10);
        raw.set_cigar(&"4=".parse().unwrap());
        raw.set_sequence_and_qualities("ACGT", "IIII").unwrap();
    }
    record.set_pulse_call("AaCcGgTt").unwrap();
    record
        .set_pkmid(&[1.0, 1.5, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5])
        .unwrap();
    record.set_query_start(0).unwrap();
    record.set_query_end(4).unwrap();

    // per-pulse data projects down to base space
    let squashed = record
        .pkmid(
            Orientation::Native,
            false,
            false,
            PulseBehavior::BasecallsOnly,
        )
        .unwrap();
    assert_eq!(squashed, vec![1.0, 2.0, 3.0, 4.0]);

    // clipping keeps the pulse span of the retained bases
    record.clip(ClipType::ClipToQuery, 1, 3, false).unwrap();
    let pc = record
        .pulse_call(Orientation::Native, false, false, PulseBehavior::All)
        .unwrap();
    assert_eq!(pc, "CcG");
    let pkmid = record
        .pkmid(Orientation::Native, false, false, PulseBehavior::All)
        .unwrap();
    assert_eq!(pkmid, vec![2.0, 2.5, 3.0]);
}

#[test]
fn photon_factor_is_ten() {
    assert_eq!(PHOTON_FACTOR, 10.0);
}
