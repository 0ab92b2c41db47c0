pub mod vote_submitter;
