//! Refund workflow - buyer claims adjudicated by admins
//!
//! A request moves Pending → {Processing, Approved, Rejected}, with
//! Processing → {Approved, Rejected}. Approved and Rejected requests are
//! immutable except for communication appends. Every transition re-checks
//! the stored status inside its write transaction, so two concurrent
//! adjudications of the same request cannot both commit.
//!
//! Order mirror writes: the order's refund fields always reflect the active
//! request; a rejection resets `refund_requested` so the buyer may file a
//! new request.

use crate::events::{DomainEvent, EventBus};
use crate::orders::money;
use crate::storage::MarketStorage;
use chrono::Utc;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    MessageSender, OrderStatus, RefundMessage, RefundProcess, RefundRequest, RefundRequestCreate,
    RefundRequestStatus, Role,
};

#[derive(Clone)]
pub struct RefundWorkflow {
    storage: MarketStorage,
    events: EventBus,
}

impl RefundWorkflow {
    pub fn new(storage: MarketStorage, events: EventBus) -> Self {
        Self { storage, events }
    }

    /// File a refund request against a paid, non-cancelled order
    ///
    /// At most one non-rejected request may exist per order at a time.
    pub fn request_refund(
        &self,
        buyer_id: &str,
        payload: RefundRequestCreate,
    ) -> AppResult<RefundRequest> {
        if payload.reason.trim().is_empty() {
            return Err(AppError::validation("Refund reason is required"));
        }

        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut order = self
            .storage
            .get_order_txn(&txn, &payload.order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::OrderNotFound,
                    format!("Order {} not found", payload.order_id),
                )
            })?;

        if order.buyer_id != buyer_id {
            return Err(AppError::forbidden("You do not own this order"));
        }
        if !order.is_paid {
            return Err(AppError::with_message(
                ErrorCode::OrderNotPaid,
                "Only paid orders can be refunded",
            ));
        }
        if order.is_cancelled || order.status == OrderStatus::Cancelled {
            return Err(AppError::with_message(
                ErrorCode::OrderCancelled,
                "Cancelled orders cannot be refunded",
            ));
        }
        if self
            .storage
            .active_refund_txn(&txn, &order.id)
            .map_err(|e| AppError::database(e.to_string()))?
            .is_some()
        {
            return Err(AppError::with_message(
                ErrorCode::RefundAlreadyRequested,
                format!("Order {} already has an active refund request", order.id),
            ));
        }

        let now = Utc::now().timestamp_millis();
        let items = match payload.items {
            Some(items) if !items.is_empty() => items,
            _ => order.items.clone(),
        };

        let request = RefundRequest {
            id: uuid::Uuid::new_v4().to_string(),
            order_id: order.id.clone(),
            buyer_id: buyer_id.to_string(),
            reason: payload.reason.clone(),
            items,
            status: RefundRequestStatus::Pending,
            admin_notes: None,
            processed_at: None,
            processed_by: None,
            refund_amount: 0.0,
            evidence: payload.evidence.unwrap_or_default(),
            communication: Vec::new(),
            created_at: now,
        };

        order.refund_requested = true;
        order.refund_requested_at = Some(now);
        order.refund_status = RefundRequestStatus::Pending.into();
        order.refund_reason = Some(payload.reason);

        self.storage
            .store_refund_request(&txn, &request)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .set_active_refund(&txn, &order.id, &request.id)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .store_order(&txn, &order)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        self.events.publish(DomainEvent::RefundRequested {
            request_id: request.id.clone(),
            order_id: order.id,
        });

        Ok(request)
    }

    /// Adjudicate a refund request (admin)
    ///
    /// Target status must be Processing, Approved or Rejected, with notes.
    /// On approval the refund amount defaults to the full order total, and an
    /// amount covering the total flips the order to Refunded. On rejection
    /// the order may receive a new request afterwards.
    pub fn process_refund(
        &self,
        request_id: &str,
        admin_id: &str,
        payload: RefundProcess,
    ) -> AppResult<RefundRequest> {
        if payload.status == RefundRequestStatus::Pending {
            return Err(AppError::validation(
                "Status must be Processing, Approved or Rejected",
            ));
        }
        if payload.admin_notes.trim().is_empty() {
            return Err(AppError::validation("Admin notes are required"));
        }

        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut request = self
            .storage
            .get_refund_request_txn(&txn, request_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| refund_not_found(request_id))?;

        // Conditional update: a request already resolved by a concurrent
        // adjudication cannot be resolved again
        if request.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::RefundAlreadyResolved,
                format!("Refund request {} is already {:?}", request_id, request.status),
            ));
        }

        let mut order = self
            .storage
            .get_order_txn(&txn, &request.order_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| {
                AppError::with_message(
                    ErrorCode::OrderNotFound,
                    format!("Order {} not found", request.order_id),
                )
            })?;

        let now = Utc::now().timestamp_millis();
        request.status = payload.status;
        request.admin_notes = Some(payload.admin_notes);
        order.refund_status = payload.status.into();

        let mut approved_amount = None;
        match payload.status {
            RefundRequestStatus::Approved => {
                let amount = payload.refund_amount.unwrap_or(order.total_price);
                if !amount.is_finite() || amount < 0.0 {
                    return Err(AppError::validation(format!(
                        "Refund amount must be a non-negative number, got {}",
                        amount
                    )));
                }
                if amount > order.total_price && !money::money_eq(amount, order.total_price) {
                    return Err(AppError::with_message(
                        ErrorCode::RefundAmountExceedsTotal,
                        format!(
                            "Refund amount {} exceeds order total {}",
                            amount, order.total_price
                        ),
                    ));
                }

                request.refund_amount = amount;
                request.processed_at = Some(now);
                request.processed_by = Some(admin_id.to_string());

                order.refund_amount = amount;
                order.refund_processed_at = Some(now);
                if amount >= order.total_price && !order.status.is_terminal() {
                    order.status = OrderStatus::Refunded;
                }
                approved_amount = Some(amount);
            }
            RefundRequestStatus::Rejected => {
                request.processed_at = Some(now);
                request.processed_by = Some(admin_id.to_string());

                // A rejected request may be superseded by a new one
                order.refund_requested = false;
                self.storage
                    .clear_active_refund(&txn, &order.id)
                    .map_err(|e| AppError::database(e.to_string()))?;
            }
            // Pending is rejected before the transaction opens
            RefundRequestStatus::Processing | RefundRequestStatus::Pending => {}
        }

        self.storage
            .store_refund_request(&txn, &request)
            .map_err(|e| AppError::database(e.to_string()))?;
        self.storage
            .store_order(&txn, &order)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        match request.status {
            RefundRequestStatus::Approved => self.events.publish(DomainEvent::RefundApproved {
                request_id: request.id.clone(),
                order_id: request.order_id.clone(),
                amount: approved_amount.unwrap_or_default(),
            }),
            RefundRequestStatus::Rejected => self.events.publish(DomainEvent::RefundRejected {
                request_id: request.id.clone(),
                order_id: request.order_id.clone(),
            }),
            _ => {}
        }

        Ok(request)
    }

    /// Append a message to the request's communication trail
    ///
    /// Allowed for the request's buyer and for admins, at any request status;
    /// prior entries are never edited or removed.
    pub fn add_message(
        &self,
        request_id: &str,
        requester_id: &str,
        role: Role,
        message: String,
    ) -> AppResult<RefundRequest> {
        if message.trim().is_empty() {
            return Err(AppError::validation("Message cannot be empty"));
        }

        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut request = self
            .storage
            .get_refund_request_txn(&txn, request_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| refund_not_found(request_id))?;

        let sender = if role.is_admin() {
            MessageSender::Admin
        } else if request.buyer_id == requester_id {
            MessageSender::Customer
        } else {
            return Err(AppError::forbidden(
                "Only the requesting buyer or an admin may post messages",
            ));
        };

        request.communication.push(RefundMessage {
            message,
            sender,
            timestamp: Utc::now().timestamp_millis(),
        });

        self.storage
            .store_refund_request(&txn, &request)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        Ok(request)
    }

    /// Attach evidence files to a still-open request
    pub fn add_evidence(
        &self,
        request_id: &str,
        buyer_id: &str,
        files: Vec<String>,
    ) -> AppResult<RefundRequest> {
        if files.is_empty() {
            return Err(AppError::validation("No evidence files supplied"));
        }

        let txn = self
            .storage
            .begin_write()
            .map_err(|e| AppError::database(e.to_string()))?;

        let mut request = self
            .storage
            .get_refund_request_txn(&txn, request_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| refund_not_found(request_id))?;

        if request.buyer_id != buyer_id {
            return Err(AppError::forbidden("You do not own this refund request"));
        }
        if request.status.is_terminal() {
            return Err(AppError::with_message(
                ErrorCode::RefundAlreadyResolved,
                "Evidence cannot be added to a resolved request",
            ));
        }

        request.evidence.extend(files);

        self.storage
            .store_refund_request(&txn, &request)
            .map_err(|e| AppError::database(e.to_string()))?;
        txn.commit()
            .map_err(|e| AppError::database(e.to_string()))?;

        Ok(request)
    }

    /// Get a refund request by id
    pub fn get_request(&self, request_id: &str) -> AppResult<RefundRequest> {
        self.storage
            .get_refund_request(request_id)
            .map_err(|e| AppError::database(e.to_string()))?
            .ok_or_else(|| refund_not_found(request_id))
    }

    /// List every refund request, newest first (admin)
    pub fn list_all(&self) -> AppResult<Vec<RefundRequest>> {
        self.storage
            .list_refund_requests()
            .map_err(|e| AppError::database(e.to_string()))
    }

    /// List all refund requests ever filed against an order
    pub fn list_for_order(&self, order_id: &str) -> AppResult<Vec<RefundRequest>> {
        self.storage
            .list_refunds_for_order(order_id)
            .map_err(|e| AppError::database(e.to_string()))
    }
}

fn refund_not_found(request_id: &str) -> AppError {
    AppError::with_message(
        ErrorCode::RefundNotFound,
        format!("Refund request {} not found", request_id),
    )
}
