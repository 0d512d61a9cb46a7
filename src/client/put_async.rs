use std::sync::atomic::Ordering;

use tracing::debug;

use super::Client;
use super::Completion;
use super::ContextState;
use super::Continuation;
use super::RequestContext;
use crate::utils::scoped_timer::ScopedTimer;
use crate::ClientError;
use crate::Error;
use crate::HostGuard;
use crate::Key;
use crate::Record;
use crate::Result;
use crate::Serializer;
use crate::SerializerStrategy;
use crate::SubmitError;
use crate::Value;
use crate::WritePolicy;

impl Client {
    /// Writes `bins` under `key` without waiting for the cluster
    ///
    /// The caller holds the host lock through `guard`; it is released while
    /// the transport queues the write and held again on return.
    ///
    /// `Ok(())` means the write was accepted. Its outcome arrives later on an
    /// event-loop thread: `continuation` is called with the translated key
    /// when the write commits, otherwise an error annotated with the key is
    /// raised on the host's unraised-error channel and `continuation` is not
    /// called.
    ///
    /// `serializer` picks the strategy for values with no native bin type for
    /// this call only; `None` uses the client's configured default.
    ///
    /// # Errors
    /// Synchronous rejections, annotated with the `key` and `bins` arguments:
    /// - `PARAM` for a client without a transport, a `guard` taken from another
    ///   [`HostRuntime`](crate::HostRuntime), or malformed key, bins, metadata
    ///   or policy
    /// - `CLUSTER` when the client is not connected
    /// - whatever the transport reports when it refuses the write
    #[allow(clippy::too_many_arguments)]
    pub fn put_async<C>(
        &self,
        guard: &mut HostGuard<'_>,
        key: &Value,
        bins: &Value,
        meta: Option<&Value>,
        policy: Option<&Value>,
        serializer: Option<Serializer>,
        continuation: C,
    ) -> std::result::Result<(), ClientError>
    where
        C: Continuation,
    {
        let _timer = ScopedTimer::new("client::put_async");

        self.submit_put(guard, key, bins, meta, policy, serializer, Box::new(continuation))
            .map_err(|e| {
                debug!("put_async rejected: {}", e);
                ClientError::from(e).with_key(key.clone()).with_bin(bins.clone())
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn submit_put(
        &self,
        guard: &mut HostGuard<'_>,
        key: &Value,
        bins: &Value,
        meta: Option<&Value>,
        policy: Option<&Value>,
        serializer: Option<Serializer>,
        continuation: Box<dyn Continuation>,
    ) -> Result<()> {
        let inner = self.inner.load_full();
        let transport = inner.transport.clone().ok_or(Error::InvalidClient)?;
        if !self.connected.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        if !std::ptr::eq(guard.runtime(), inner.host.as_ref()) {
            return Err(Error::ForeignHostGuard);
        }

        let key = Key::from_value(key)?;
        let mut context = RequestContext::create(key, continuation, inner.client_id);

        let strategy = SerializerStrategy::new(
            serializer.unwrap_or(inner.config.serializer),
            inner.user_serializer.as_ref(),
        );
        let converted = Record::from_values(bins, meta, &strategy)
            .map_err(Error::from)
            .and_then(|record| {
                let policy = WritePolicy::from_value(policy, &inner.config.policies.write)?;
                Ok((record, policy))
            });
        let (record, policy) = match converted {
            Ok(converted) => converted,
            Err(e) => {
                context.destroy(ContextState::Abandoned);
                return Err(e);
            }
        };

        context.mark_submitted();
        let completion = Completion::new(context, inner.host.clone());

        let submitted = guard.allow_threads(|| transport.submit_write(&policy, &record, completion));
        if let Err(SubmitError { error, completion }) = submitted {
            completion.abandon();
            return Err(error.into());
        }

        debug!("put_async accepted for client {}", inner.client_id);
        Ok(())
    }
}
