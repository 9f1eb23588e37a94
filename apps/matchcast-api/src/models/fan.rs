use matchcast_common::id::{prefix, prefixed_ulid};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::broadcast::types::{DeliveryType, Subscription};

/// A fan's subscription to a team channel, as stored by the fan source.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Fan {
    pub id: String,
    pub user_id: String,
    pub channel_id: String,
    pub notification_type: DeliveryType,
    pub address: String,
}

impl Fan {
    pub fn new(
        user_id: impl Into<String>,
        channel_id: impl Into<String>,
        notification_type: DeliveryType,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: prefixed_ulid(prefix::SUBSCRIPTION),
            user_id: user_id.into(),
            channel_id: channel_id.into(),
            notification_type,
            address: address.into(),
        }
    }
}

impl From<Fan> for Subscription {
    fn from(fan: Fan) -> Self {
        Subscription {
            id: fan.id,
            subscriber_id: fan.user_id,
            channel_id: fan.channel_id,
            notification_type: fan.notification_type,
            address: fan.address,
        }
    }
}
