use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use hyper::{Body, Request, Response};
use tracing::{debug, warn};

use crate::error::PublishError;
use crate::handler::Handler;

/// Remote address of the connection, stored in request extensions by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub SocketAddr);

/// Per-client limit like `10/minute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub count: NonZeroU32,
    pub period: Period,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Second,
    Minute,
    Hour,
}

impl Rate {
    /// Parses `<count>/<second|minute|hour>`.
    pub fn parse(value: &str) -> Result<Self, PublishError> {
        let invalid = || PublishError::Config(format!("invalid rate limit \"{}\"", value));

        let (count, period) = value.split_once('/').ok_or_else(invalid)?;
        let count = count
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(invalid)?;
        let period = match period.trim() {
            "second" | "s" => Period::Second,
            "minute" | "m" => Period::Minute,
            "hour" | "h" => Period::Hour,
            _ => return Err(invalid()),
        };
        Ok(Self { count, period })
    }

    fn quota(&self) -> Quota {
        match self.period {
            Period::Second => Quota::per_second(self.count),
            Period::Minute => Quota::per_minute(self.count),
            Period::Hour => Quota::per_hour(self.count),
        }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let period = match self.period {
            Period::Second => "second",
            Period::Minute => "minute",
            Period::Hour => "hour",
        };
        write!(f, "{} per 1 {}", self.count, period)
    }
}

/// Keyed limiter counting requests per client IP.
pub struct RateLimit {
    rate: Rate,
    limiter: Option<DefaultKeyedRateLimiter<IpAddr>>,
}

impl RateLimit {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            limiter: Some(RateLimiter::keyed(rate.quota())),
        }
    }

    /// A limit that lets everything through.
    pub fn disabled(rate: Rate) -> Self {
        Self {
            rate,
            limiter: None,
        }
    }

    pub fn with_enabled(rate: Rate, enabled: bool) -> Self {
        if enabled {
            Self::new(rate)
        } else {
            Self::disabled(rate)
        }
    }

    pub fn check(&self, ip: IpAddr) -> Result<(), PublishError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check_key(&ip).map_err(|_| {
            warn!("Rate limit {} exceeded for {}", self.rate, ip);
            PublishError::RateLimited(self.rate.to_string())
        })
    }

    pub fn wrap<H: Handler>(self, handler: H) -> RateLimited<H> {
        RateLimited {
            inner: handler,
            limit: self,
        }
    }
}

pub fn client_ip(req: &Request<Body>) -> IpAddr {
    req.extensions()
        .get::<ClientAddr>()
        .map(|addr| addr.0.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Handler wrapper rejecting clients over their limit with `429`.
pub struct RateLimited<H> {
    inner: H,
    limit: RateLimit,
}

#[async_trait]
impl<H: Handler> Handler for RateLimited<H> {
    async fn call(&self, req: Request<Body>) -> Response<Body> {
        let ip = client_ip(&req);
        match self.limit.check(ip) {
            Ok(()) => {
                debug!("Rate limit {} ok for {}", self.limit.rate, ip);
                self.inner.call(req).await
            }
            Err(e) => e.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::sync_handler;
    use crate::response;
    use hyper::StatusCode;

    #[test]
    fn test_parse_rate() {
        let rate = Rate::parse("10/minute").unwrap();
        assert_eq!(rate.count.get(), 10);
        assert_eq!(rate.period, Period::Minute);
        assert_eq!(rate.to_string(), "10 per 1 minute");

        assert_eq!(Rate::parse("60/hour").unwrap().period, Period::Hour);
        assert!(Rate::parse("0/minute").is_err());
        assert!(Rate::parse("ten/minute").is_err());
        assert!(Rate::parse("10/fortnight").is_err());
        assert!(Rate::parse("10").is_err());
    }

    #[test]
    fn test_limit_is_per_client() {
        let limit = RateLimit::new(Rate::parse("2/hour").unwrap());
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();

        assert!(limit.check(a).is_ok());
        assert!(limit.check(a).is_ok());
        assert!(matches!(limit.check(a), Err(PublishError::RateLimited(_))));
        assert!(limit.check(b).is_ok());
    }

    #[test]
    fn test_disabled_never_limits() {
        let limit = RateLimit::with_enabled(Rate::parse("1/hour").unwrap(), false);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        for _ in 0..10 {
            assert!(limit.check(ip).is_ok());
        }
    }

    #[tokio::test]
    async fn test_wrapped_handler_returns_429() {
        let handler = RateLimit::new(Rate::parse("1/minute").unwrap()).wrap(sync_handler(
            |_req: Request<Body>| response::status(StatusCode::OK),
        ));

        let res = handler.call(Request::new(Body::empty())).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = handler.call(Request::new(Body::empty())).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
