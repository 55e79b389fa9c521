use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunqError {
	#[error("no options supplied")]
	NoFlags,
	#[error("at least one CPU must be tracked")]
	NoCpus,
	#[error("cannot track {0} CPUs")]
	TooManyCpus(usize),
}
