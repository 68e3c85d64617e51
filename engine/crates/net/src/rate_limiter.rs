use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Connection and input limits applied at the network edge.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub max_connections_total: usize,
    pub max_connections_per_ip: usize,
    pub max_commands_per_second: u32,
    pub max_input_length: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_connections_total: 1000,
            max_connections_per_ip: 5,
            max_commands_per_second: 20,
            max_input_length: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitRejection {
    #[error("server at max connections")]
    TotalLimitReached,
    #[error("too many connections from this address")]
    IpLimitReached,
}

/// Tracks connection counts per IP and in total.
#[derive(Debug)]
pub struct ConnectionLimiter {
    config: RateLimitConfig,
    total: usize,
    per_ip: BTreeMap<IpAddr, usize>,
}

pub type SharedLimiter = Arc<Mutex<ConnectionLimiter>>;

impl ConnectionLimiter {
    pub fn new(config: RateLimitConfig) -> SharedLimiter {
        Arc::new(Mutex::new(Self {
            config,
            total: 0,
            per_ip: BTreeMap::new(),
        }))
    }

    pub fn try_admit(&mut self, ip: IpAddr) -> Result<(), RateLimitRejection> {
        if self.total >= self.config.max_connections_total {
            return Err(RateLimitRejection::TotalLimitReached);
        }
        let count = self.per_ip.entry(ip).or_insert(0);
        if *count >= self.config.max_connections_per_ip {
            return Err(RateLimitRejection::IpLimitReached);
        }
        *count += 1;
        self.total += 1;
        Ok(())
    }

    pub fn release(&mut self, ip: IpAddr) {
        if let Some(count) = self.per_ip.get_mut(&ip) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.per_ip.remove(&ip);
            }
        }
        self.total = self.total.saturating_sub(1);
    }

    pub fn total_connections(&self) -> usize {
        self.total
    }
}

/// Holds an admitted slot and gives it back when dropped, whichever way the
/// connection task ends.
pub struct ConnectionSlot {
    limiter: SharedLimiter,
    ip: IpAddr,
}

impl ConnectionSlot {
    pub fn acquire(limiter: &SharedLimiter, ip: IpAddr) -> Result<Self, RateLimitRejection> {
        limiter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .try_admit(ip)?;
        Ok(Self {
            limiter: Arc::clone(limiter),
            ip,
        })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.limiter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .release(self.ip);
    }
}

/// Per-session token bucket for commands.
#[derive(Debug)]
pub struct CommandThrottle {
    max_per_second: u32,
    tokens: u32,
    last_refill: Instant,
}

impl CommandThrottle {
    pub fn new(max_per_second: u32) -> Self {
        Self {
            max_per_second,
            tokens: max_per_second,
            last_refill: Instant::now(),
        }
    }

    pub fn try_consume(&mut self) -> bool {
        self.try_consume_at(Instant::now())
    }

    pub fn try_consume_at(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let new_tokens = (elapsed.as_secs_f64() * self.max_per_second as f64) as u32;
        if new_tokens > 0 {
            self.tokens = self.tokens.saturating_add(new_tokens).min(self.max_per_second);
            self.last_refill = now;
        }
    }
}
