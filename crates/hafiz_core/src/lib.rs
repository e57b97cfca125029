pub mod domain;
pub mod locator;
pub mod ports;
pub mod quota;
pub mod resolver;

pub use domain::{
    AudioClip, CallerIdentity, CandidateMatch, LineEstimate, LinePosition, PageLocation,
    PageSource, QuotaDecision, QuotaInfo, QuotaStatus, ResolvedMatch, Surah,
};
pub use locator::{LocatorTable, DENSITY_TABLE_VERSION, LINES_PER_PAGE, PAGE_COUNT};
pub use ports::{PortError, PortResult, RecitationMatcher};
pub use quota::{Clock, QuotaTracker, SystemClock};
pub use resolver::{LocatorError, PageResolver};
