//! Sort token parsing, physical order expansion and toggle links
//!
//! A sort token is a separator-joined list of attribute names, each
//! optionally prefixed with `-` for descending order, e.g. `-year,title`.
//! Token order is precedence order.

use super::direction::SortDirection;
use super::order_spec::{OrderSpec, OrderTuple};
use crate::error::Result;
use crate::query::request::{QueryParams, RequestQuery, find_param, set_param};
use crate::query::settings::SortSettings;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A logical attribute and the direction it is sorted in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeOrder {
    pub attribute: String,
    pub direction: SortDirection,
}

impl AttributeOrder {
    pub fn new(attribute: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            attribute: attribute.into(),
            direction,
        }
    }

    pub fn asc(attribute: impl Into<String>) -> Self {
        Self::new(attribute, SortDirection::Ascending)
    }

    pub fn desc(attribute: impl Into<String>) -> Self {
        Self::new(attribute, SortDirection::Descending)
    }
}

/// Resolved attribute orders, highest precedence first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SortState {
    attribute_orders: Vec<AttributeOrder>,
}

impl SortState {
    pub fn new(attribute_orders: Vec<AttributeOrder>) -> Self {
        Self { attribute_orders }
    }

    pub fn attribute_orders(&self) -> &[AttributeOrder] {
        &self.attribute_orders
    }

    pub fn direction_of(&self, attribute: &str) -> Option<SortDirection> {
        self.attribute_orders
            .iter()
            .find(|order| order.attribute == attribute)
            .map(|order| order.direction)
    }

    pub fn is_empty(&self) -> bool {
        self.attribute_orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attribute_orders.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeOrder> {
        self.attribute_orders.iter()
    }

    /// Serialize back into a sort token.
    pub fn to_token(&self, separator: &str) -> String {
        self.attribute_orders
            .iter()
            .map(|order| match order.direction {
                SortDirection::Ascending => order.attribute.clone(),
                SortDirection::Descending => format!("-{}", order.attribute),
            })
            .collect::<Vec<_>>()
            .join(separator)
    }
}

impl From<Vec<AttributeOrder>> for SortState {
    fn from(attribute_orders: Vec<AttributeOrder>) -> Self {
        Self::new(attribute_orders)
    }
}

/// Resolve a raw sort token against `spec`.
///
/// Unknown attribute names are skipped so stale links keep working, repeated
/// names keep their first occurrence, and single-sort mode stops after the
/// first resolved attribute. When nothing resolves, `default_order` is used
/// as given.
pub fn resolve(
    raw_token: Option<&str>,
    spec: &OrderSpec,
    multi_sort: bool,
    default_order: &[AttributeOrder],
    separator: &str,
) -> SortState {
    let mut orders: Vec<AttributeOrder> = Vec::new();

    let tokens: Vec<&str> = match raw_token {
        Some(raw) if separator.is_empty() => vec![raw],
        Some(raw) => raw.split(separator).collect(),
        None => Vec::new(),
    };

    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (name, direction) = match token.strip_prefix('-') {
            Some(name) => (name, SortDirection::Descending),
            None => (token, SortDirection::Ascending),
        };
        if !spec.contains(name) {
            debug!(attribute = name, "ignoring unknown sort attribute");
            continue;
        }
        if orders.iter().any(|order| order.attribute == name) {
            continue;
        }
        orders.push(AttributeOrder::new(name, direction));
        if !multi_sort {
            break;
        }
    }

    if orders.is_empty() && !default_order.is_empty() {
        orders = default_order.to_vec();
    }
    SortState::new(orders)
}

/// Expand attribute orders into physical field orders.
///
/// A field reached through more than one attribute keeps the direction of
/// its first (highest precedence) occurrence.
pub fn orders_for(state: &SortState, spec: &OrderSpec) -> Result<Vec<OrderTuple>> {
    let mut orders: Vec<OrderTuple> = Vec::new();
    for order in state.iter() {
        let definition = spec.require(&order.attribute)?;
        for tuple in definition.orders(order.direction) {
            if !orders.iter().any(|seen| seen.field == tuple.field) {
                orders.push(tuple.clone());
            }
        }
    }
    Ok(orders)
}

/// Token for the "click to sort by `attribute`" link.
///
/// A sorted attribute flips direction; an unsorted one starts in its default
/// direction. In multi-sort mode the toggled attribute moves to the front and
/// the other current attributes follow in their existing order.
pub fn toggle_token(
    attribute: &str,
    state: &SortState,
    spec: &OrderSpec,
    multi_sort: bool,
    separator: &str,
) -> Result<String> {
    let definition = spec.require(attribute)?;
    let direction = match state.direction_of(attribute) {
        Some(current) => current.reversed(),
        None => definition.default_direction,
    };

    let mut next = vec![AttributeOrder::new(attribute, direction)];
    if multi_sort {
        next.extend(
            state
                .iter()
                .filter(|order| order.attribute != attribute)
                .cloned(),
        );
    }
    Ok(SortState::new(next).to_token(separator))
}

/// What a view needs to render one sortable column header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortLink {
    pub attribute: String,
    pub label: String,
    pub url: String,
    /// Current direction, `None` when the column is not sorted.
    pub direction: Option<SortDirection>,
}

/// Sort configuration plus the request it reads its token from.
#[derive(Debug, Clone, Default)]
pub struct SortModel {
    spec: OrderSpec,
    settings: SortSettings,
    default_order: Vec<AttributeOrder>,
    request: RequestQuery,
    params: Option<QueryParams>,
    state: Option<SortState>,
}

impl SortModel {
    pub fn new(spec: OrderSpec, settings: SortSettings, request: RequestQuery) -> Self {
        Self {
            spec,
            settings,
            default_order: Vec::new(),
            request,
            params: None,
            state: None,
        }
    }

    pub fn with_default_order(mut self, default_order: Vec<AttributeOrder>) -> Self {
        self.set_default_order(default_order);
        self
    }

    pub fn spec(&self) -> &OrderSpec {
        &self.spec
    }

    pub fn settings(&self) -> &SortSettings {
        &self.settings
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.spec.contains(attribute)
    }

    pub fn set_spec(&mut self, spec: OrderSpec) {
        self.spec = spec;
        self.state = None;
    }

    pub fn set_settings(&mut self, settings: SortSettings) {
        self.settings = settings;
        self.state = None;
    }

    pub fn set_enable_multi_sort(&mut self, enabled: bool) {
        self.settings.enable_multi_sort = enabled;
        self.state = None;
    }

    pub fn set_default_order(&mut self, default_order: Vec<AttributeOrder>) {
        self.default_order = default_order;
        self.state = None;
    }

    /// Use `params` instead of the request's own query string.
    pub fn set_params(&mut self, params: QueryParams) {
        self.params = Some(params);
        self.state = None;
    }

    pub fn set_request(&mut self, request: RequestQuery) {
        self.request = request;
        self.state = None;
    }

    /// The incoming sort token, if any.
    pub fn raw_token(&self) -> Option<&str> {
        match &self.params {
            Some(params) => find_param(params, &self.settings.sort_param),
            None => self.request.param(&self.settings.sort_param),
        }
    }

    /// Current attribute orders, resolved from the request once and cached
    /// until `recalculate` is set or the inputs change.
    pub fn attribute_orders(&mut self, recalculate: bool) -> &SortState {
        if recalculate || self.state.is_none() {
            let state = resolve(
                self.raw_token(),
                &self.spec,
                self.settings.enable_multi_sort,
                &self.default_order,
                &self.settings.separator,
            );
            self.state = Some(state);
        }
        self.state.get_or_insert_with(SortState::default)
    }

    /// Replace the resolved orders directly. With `validate`, unknown
    /// attributes are dropped and single-sort mode keeps only the first.
    pub fn set_attribute_orders(&mut self, orders: Vec<AttributeOrder>, validate: bool) {
        let orders = if validate {
            let mut kept: Vec<AttributeOrder> = Vec::new();
            for order in orders {
                if !self.spec.contains(&order.attribute)
                    || kept.iter().any(|k| k.attribute == order.attribute)
                {
                    continue;
                }
                kept.push(order);
                if !self.settings.enable_multi_sort {
                    break;
                }
            }
            kept
        } else {
            orders
        };
        self.state = Some(SortState::new(orders));
    }

    pub fn attribute_order(&mut self, attribute: &str) -> Option<SortDirection> {
        self.attribute_orders(false).direction_of(attribute)
    }

    /// Physical field orders for the current state.
    pub fn orders(&mut self, recalculate: bool) -> Result<Vec<OrderTuple>> {
        self.attribute_orders(recalculate);
        let state = self.state.clone().unwrap_or_default();
        orders_for(&state, &self.spec)
    }

    pub fn orders_for(&self, state: &SortState) -> Result<Vec<OrderTuple>> {
        orders_for(state, &self.spec)
    }

    pub fn toggle_token(&mut self, attribute: &str) -> Result<String> {
        let state = self.attribute_orders(false).clone();
        toggle_token(
            attribute,
            &state,
            &self.spec,
            self.settings.enable_multi_sort,
            &self.settings.separator,
        )
    }

    /// URL that sorts by `attribute` (toggling it if already sorted).
    pub fn create_url(&mut self, attribute: &str, absolute: bool) -> Result<String> {
        let token = self.toggle_token(attribute)?;
        let mut params = self
            .params
            .clone()
            .unwrap_or_else(|| self.request.params().to_vec());
        set_param(&mut params, &self.settings.sort_param, token);
        Ok(self.request.url_with(&params, absolute))
    }

    pub fn sort_link(&mut self, attribute: &str, absolute: bool) -> Result<SortLink> {
        let url = self.create_url(attribute, absolute)?;
        Ok(SortLink {
            attribute: attribute.to_string(),
            label: self.spec.label(attribute)?,
            url,
            direction: self.attribute_order(attribute),
        })
    }
}
