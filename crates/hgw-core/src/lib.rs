//! # hgw-core — Orchestration Core of the Huffman Gateway
//!
//! The Huffman codec itself is an opaque external executable. This crate is
//! everything around it: staging uploaded bytes on disk, running the codec
//! with a fixed argument contract, and mapping its exit status to a job
//! result.
//!
//! ## Components
//!
//! | Module        | Component       | Responsibility                                  |
//! |---------------|-----------------|-------------------------------------------------|
//! | [`artifact`]  | Artifact Store  | Staging directory, safe name resolution          |
//! | [`codec`]     | Codec Invoker   | `<exe> <c\|d> <in> <out>`, exit classification    |
//! | [`pipeline`]  | Job Pipeline    | `Received → Staged → Invoked → Completed/Failed` |
//! | [`error`]     | —               | `thiserror` hierarchy for all of the above       |
//!
//! The pipeline touches the filesystem only through [`ArtifactStore`], and
//! talks to the codec only through the [`Codec`] trait, so tests can swap in
//! an in-process fake.

pub mod artifact;
pub mod codec;
pub mod error;
pub mod pipeline;

pub use artifact::{ArtifactKind, ArtifactStore, StagedArtifact};
pub use codec::{Codec, CodecInvocation, CodecMode, CodecOutcome, ProcessCodec, DIAGNOSTIC_LIMIT};
pub use error::{ArtifactError, CodecError, JobError};
pub use pipeline::{Job, JobPipeline, JobReport, JobState};
