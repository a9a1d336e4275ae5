pub mod cats;
pub mod matches;
pub mod users;

pub use cats::{Cat, CatPayload, CatRace, Sex};
pub use matches::{CatDetail, Issuer, Match, MatchDetail, MatchProposalRequest, MatchStatus};
pub use users::{Credential, RegisterRequest, User};
