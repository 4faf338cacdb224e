//! Referral Telemetry Graph
//!
//! 방문 이벤트로부터 만들어지는 분석 전용 인메모리 추천 그래프.
//!
//! 내구 추천 저장소와는 의도적으로 독립이다 — 두 신호는 서로
//! 조정(reconcile)되지 않으며, 여기 상태는 프로세스 수명과 함께
//! 사라진다. 재시작 후 비어 있는 것은 정상이다.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 트리 전개 기본 최대 깊이 — 사이클이 있어도 종료를 보장한다
const DEFAULT_MAX_DEPTH: usize = 6;

/// 기록된 방문 이벤트 (append-only)
#[derive(Debug, Clone, Serialize)]
pub struct VisitEvent {
    pub referrer_id: i64,
    pub visitor_id: Option<i64>,
    pub source: String,
    pub ts: DateTime<Utc>,
}

/// 그래프 요약 통계
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryStats {
    pub total_vertices: usize,
    pub total_edges: usize,
    pub total_visits: usize,
    /// 들어오는 간선이 없는 정점들 (정렬됨)
    pub roots: Vec<i64>,
}

/// 추천 트리 노드
#[derive(Debug, Clone, Serialize)]
pub struct ReferralNode {
    pub user_id: i64,
    pub children: Vec<ReferralNode>,
}

#[derive(Default)]
struct GraphState {
    /// referrer -> 방문자들 (간선은 한 번만)
    children: HashMap<i64, Vec<i64>>,
    visits: Vec<VisitEvent>,
}

/// 분석용 추천 텔레메트리 그래프
///
/// 프로세스 시작 시 한 번 만들어 핸들러에 주입한다.
pub struct ReferralTelemetryGraph {
    inner: RwLock<GraphState>,
}

impl ReferralTelemetryGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphState::default()),
        }
    }

    /// 방문 기록. 방문자 id가 있고 추천인과 다르면 간선도 추가한다
    /// (자기 자신으로의 간선은 무시).
    pub fn record_visit(
        &self,
        referrer_id: i64,
        visitor_id: Option<i64>,
        source: Option<&str>,
        ts: Option<DateTime<Utc>>,
    ) -> VisitEvent {
        let event = VisitEvent {
            referrer_id,
            visitor_id,
            source: source.unwrap_or("unknown").to_string(),
            ts: ts.unwrap_or_else(Utc::now),
        };

        let mut state = self.inner.write().unwrap();
        state.visits.push(event.clone());

        if let Some(visitor) = visitor_id {
            if visitor != referrer_id {
                let children = state.children.entry(referrer_id).or_default();
                if !children.contains(&visitor) {
                    children.push(visitor);
                }
            }
        }

        event
    }

    pub fn stats(&self) -> TelemetryStats {
        let state = self.inner.read().unwrap();

        let mut vertices: HashSet<i64> = HashSet::new();
        let mut referred: HashSet<i64> = HashSet::new();
        let mut total_edges = 0;
        for (referrer, children) in &state.children {
            vertices.insert(*referrer);
            vertices.extend(children.iter().copied());
            referred.extend(children.iter().copied());
            total_edges += children.len();
        }

        let mut roots: Vec<i64> = vertices.difference(&referred).copied().collect();
        roots.sort_unstable();

        TelemetryStats {
            total_vertices: vertices.len(),
            total_edges,
            total_visits: state.visits.len(),
            roots,
        }
    }

    /// 주어진 사용자부터 추천 트리 전개 (기본 깊이 제한)
    ///
    /// 기록이 전혀 없는 사용자도 빈 children의 단일 노드를 돌려준다 —
    /// 에러가 아니다.
    pub fn tree(&self, user_id: i64) -> ReferralNode {
        self.tree_with_depth(user_id, DEFAULT_MAX_DEPTH)
    }

    pub fn tree_with_depth(&self, user_id: i64, max_depth: usize) -> ReferralNode {
        let state = self.inner.read().unwrap();
        Self::build_tree(&state, user_id, 0, max_depth)
    }

    fn build_tree(
        state: &GraphState,
        user_id: i64,
        depth: usize,
        max_depth: usize,
    ) -> ReferralNode {
        if depth > max_depth {
            return ReferralNode {
                user_id,
                children: Vec::new(),
            };
        }

        let children = state
            .children
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .map(|child| Self::build_tree(state, *child, depth + 1, max_depth))
                    .collect()
            })
            .unwrap_or_default();

        ReferralNode { user_id, children }
    }
}

impl Default for ReferralTelemetryGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_yields_empty_node() {
        let graph = ReferralTelemetryGraph::new();
        let node = graph.tree(12345);
        assert_eq!(node.user_id, 12345);
        assert!(node.children.is_empty());
    }

    #[test]
    fn test_visit_without_visitor_only_logs() {
        let graph = ReferralTelemetryGraph::new();
        graph.record_visit(1, None, Some("landing"), None);

        let stats = graph.stats();
        assert_eq!(stats.total_visits, 1);
        assert_eq!(stats.total_vertices, 0);
        assert_eq!(stats.total_edges, 0);
    }

    #[test]
    fn test_edge_added_once_and_self_loop_ignored() {
        let graph = ReferralTelemetryGraph::new();
        graph.record_visit(1, Some(2), None, None);
        graph.record_visit(1, Some(2), None, None);
        graph.record_visit(1, Some(1), None, None);

        let stats = graph.stats();
        assert_eq!(stats.total_edges, 1);
        assert_eq!(stats.total_visits, 3);
        assert_eq!(stats.total_vertices, 2);
    }

    #[test]
    fn test_roots_are_vertices_without_incoming_edge() {
        let graph = ReferralTelemetryGraph::new();
        graph.record_visit(1, Some(2), None, None);
        graph.record_visit(2, Some(3), None, None);
        graph.record_visit(10, Some(11), None, None);

        let stats = graph.stats();
        assert_eq!(stats.roots, vec![1, 10]);
    }

    #[test]
    fn test_tree_expansion() {
        let graph = ReferralTelemetryGraph::new();
        graph.record_visit(1, Some(2), None, None);
        graph.record_visit(1, Some(3), None, None);
        graph.record_visit(2, Some(4), None, None);

        let node = graph.tree(1);
        assert_eq!(node.children.len(), 2);
        let second = node.children.iter().find(|c| c.user_id == 2).unwrap();
        assert_eq!(second.children.len(), 1);
        assert_eq!(second.children[0].user_id, 4);
    }

    #[test]
    fn test_depth_cap_terminates_on_cycle() {
        let graph = ReferralTelemetryGraph::new();
        // 2 -> 3 -> 2 사이클
        graph.record_visit(2, Some(3), None, None);
        graph.record_visit(3, Some(2), None, None);

        // 깊이 제한 덕에 무한 재귀 없이 끝나야 한다
        let node = graph.tree_with_depth(2, 4);

        let mut depth = 0;
        let mut cursor = &node;
        while let Some(child) = cursor.children.first() {
            cursor = child;
            depth += 1;
        }
        assert!(depth <= 5);
    }
}
