//! Wire messages for the `votegate.v1.RateLimitService` gRPC interface.

/// A request the web tier wants a decision on.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RateLimitRequest {
    /// Identity of the caller, usually the client IP
    #[prost(string, tag = "1")]
    pub client_key: ::prost::alloc::string::String,
    /// Request path, e.g. `/api/v1/auth/login`
    #[prost(string, tag = "2")]
    pub path: ::prost::alloc::string::String,
}

/// A header the web tier should add to its response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct HeaderValue {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub value: ::prost::alloc::string::String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RateLimitResponse {
    #[prost(enumeration = "Code", tag = "1")]
    pub code: i32,
    /// Category the request was counted under
    #[prost(string, tag = "2")]
    pub category: ::prost::alloc::string::String,
    #[prost(uint32, tag = "3")]
    pub limit: u32,
    #[prost(uint32, tag = "4")]
    pub remaining: u32,
    /// Seconds since the epoch at which the oldest counted request expires
    #[prost(uint64, tag = "5")]
    pub reset: u64,
    #[prost(uint32, tag = "6")]
    pub window: u32,
    /// The path bypassed rate limiting
    #[prost(bool, tag = "7")]
    pub excluded: bool,
    #[prost(message, repeated, tag = "8")]
    pub response_headers_to_add: ::prost::alloc::vec::Vec<HeaderValue>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RecordResponse {
    /// Whether the request was written to the ledger
    #[prost(bool, tag = "1")]
    pub recorded: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Code {
    Unknown = 0,
    Ok = 1,
    OverLimit = 2,
}

impl Code {
    pub fn as_str_name(&self) -> &'static str {
        match self {
            Code::Unknown => "UNKNOWN",
            Code::Ok => "OK",
            Code::OverLimit => "OVER_LIMIT",
        }
    }
}

include!(concat!(env!("OUT_DIR"), "/votegate.v1.RateLimitService.rs"));
