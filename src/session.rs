//! Call-site state for one user editing session.
//!
//! A session holds the selected image, the prompt and the outcome of the
//! latest transformation cycle:
//!
//! ```text
//! Idle -> Generating -> Success(image) | Error(message)
//! ```
//!
//! Every [`Session::begin`] issues a [`Ticket`] with a fresh sequence
//! number. Only the result for the most recent ticket is applied, so a
//! cycle superseded by a new file selection can never overwrite newer state.

use crate::error::Result;
use crate::image::{EncodedImage, TransformationRequest, TransformedImage};
use crate::transform::{TransformationClient, Transport};

/// Outcome of the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    /// Nothing in flight, no result shown.
    #[default]
    Idle,
    /// A request is outstanding.
    Generating,
    /// The model returned an image.
    Success(TransformedImage),
    /// The cycle failed; holds the message to display.
    Error(String),
}

impl Status {
    /// Returns true while a request is outstanding.
    pub fn is_generating(&self) -> bool {
        matches!(self, Self::Generating)
    }
}

/// Permission to run one cycle, issued by [`Session::begin`].
#[derive(Debug)]
#[must_use = "a ticket must be completed for its result to be shown"]
pub struct Ticket {
    seq: u64,
    request: TransformationRequest,
}

impl Ticket {
    /// The request to dispatch.
    pub fn request(&self) -> &TransformationRequest {
        &self.request
    }

    /// Sequence number of this cycle.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Selected image, prompt and latest outcome.
#[derive(Debug, Default)]
pub struct Session {
    image: Option<EncodedImage>,
    prompt: String,
    status: Status,
    seq: u64,
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects a new image. Discards any result and invalidates outstanding tickets.
    pub fn select_image(&mut self, image: EncodedImage) {
        self.image = Some(image);
        self.status = Status::Idle;
        self.seq += 1;
    }

    /// Replaces the prompt.
    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    /// The selected image, if any.
    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    /// The current prompt.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The latest outcome.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// True when an image is selected, the prompt is not blank and nothing is in flight.
    pub fn can_submit(&self) -> bool {
        self.image.is_some() && !self.prompt.trim().is_empty() && !self.status.is_generating()
    }

    /// Starts a cycle if [`can_submit`](Self::can_submit) allows it.
    pub fn begin(&mut self) -> Option<Ticket> {
        if !self.can_submit() {
            return None;
        }
        let image = self.image.clone()?;

        self.seq += 1;
        self.status = Status::Generating;
        Some(Ticket {
            seq: self.seq,
            request: TransformationRequest::new(image, self.prompt.clone()),
        })
    }

    /// Applies the result of `ticket`'s cycle.
    ///
    /// Returns false, leaving the session untouched, if the ticket has been
    /// superseded.
    pub fn complete(&mut self, ticket: Ticket, result: Result<TransformedImage>) -> bool {
        if ticket.seq != self.seq {
            tracing::debug!(
                ticket = ticket.seq,
                latest = self.seq,
                "discarding result of superseded cycle"
            );
            return false;
        }

        self.status = match result {
            Ok(image) => Status::Success(image),
            Err(err) => Status::Error(err.user_message()),
        };
        true
    }

    /// Runs a whole cycle: begin, transform, complete.
    ///
    /// Returns false without contacting the model if the submit guard refuses.
    pub async fn submit<T: Transport>(&mut self, client: &TransformationClient<T>) -> bool {
        let Some(ticket) = self.begin() else {
            return false;
        };
        let result = client.transform(ticket.request()).await;
        self.complete(ticket, result);
        true
    }
}
