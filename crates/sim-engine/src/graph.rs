//! Room-graph traversal.
//!
//! A thin snapshot over the room set, with BFS helpers over [`RoomId`]s
//! for both pathfinding and ranged reachability. The propagator uses
//! [`RoomGraph::bfs_within_range`] to compute recipients; the AI
//! spatial-memory refresh reuses the same BFS shape rooted at an agent's
//! home room.

use std::collections::{HashMap, HashSet, VecDeque};

use world_model::{Room, RoomId};

pub struct RoomGraph {
    rooms: HashMap<RoomId, Room>,
}

impl RoomGraph {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self {
            rooms: rooms.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    pub fn get(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// The room new characters spawn into. Picks the first room flagged
    /// `is_starting` found during iteration; callers that need a
    /// deterministic tie-break among multiple starting rooms should not
    /// rely on which one wins.
    pub fn starting_room(&self) -> Option<RoomId> {
        self.rooms.values().find(|r| r.is_starting).map(|r| r.id)
    }

    fn neighbours(&self, id: RoomId) -> Vec<RoomId> {
        self.rooms
            .get(&id)
            .map(|room| room.exits.values().copied().collect())
            .unwrap_or_default()
    }

    /// All rooms reachable from `from` within `max_hops`, paired with their
    /// hop distance. `from` itself is included at distance 0.
    pub fn bfs_within_range(&self, from: RoomId, max_hops: u32) -> Vec<(RoomId, u32)> {
        let mut visited = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(from, 0u32);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            let distance = visited[&current];
            if distance >= max_hops {
                continue;
            }
            for next in self.neighbours(current) {
                if !visited.contains_key(&next) {
                    visited.insert(next, distance + 1);
                    queue.push_back(next);
                }
            }
        }

        visited.into_iter().collect()
    }

    pub fn path_exists(&self, from: RoomId, to: RoomId) -> bool {
        if from == to {
            return true;
        }
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for next in self.neighbours(current) {
                if next == to {
                    return true;
                }
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Hop distance from `from` to `to`, or `None` if unreachable.
    pub fn distance(&self, from: RoomId, to: RoomId) -> Option<u32> {
        if from == to {
            return Some(0);
        }
        let mut visited = HashMap::new();
        let mut queue = VecDeque::new();
        visited.insert(from, 0u32);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            let distance = visited[&current];
            for next in self.neighbours(current) {
                if next == to {
                    return Some(distance + 1);
                }
                if !visited.contains_key(&next) {
                    visited.insert(next, distance + 1);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_rooms(n: usize) -> (Vec<Room>, Vec<RoomId>) {
        let mut rooms: Vec<Room> = (0..n).map(|i| Room::new(format!("Room {i}"), "")).collect();
        let ids: Vec<RoomId> = rooms.iter().map(|r| r.id).collect();
        for i in 0..n - 1 {
            rooms[i].exits.insert("north".into(), ids[i + 1]);
            rooms[i + 1].exits.insert("south".into(), ids[i]);
        }
        (rooms, ids)
    }

    #[test]
    fn bfs_respects_hop_limit() {
        let (rooms, ids) = linear_rooms(5);
        let graph = RoomGraph::new(rooms);
        let within_two = graph.bfs_within_range(ids[0], 2);
        let reached: HashSet<RoomId> = within_two.iter().map(|(id, _)| *id).collect();
        assert!(reached.contains(&ids[2]));
        assert!(!reached.contains(&ids[3]));
    }

    #[test]
    fn distance_matches_linear_layout() {
        let (rooms, ids) = linear_rooms(4);
        let graph = RoomGraph::new(rooms);
        assert_eq!(graph.distance(ids[0], ids[3]), Some(3));
        assert_eq!(graph.distance(ids[0], ids[0]), Some(0));
    }

    #[test]
    fn starting_room_finds_the_flagged_room() {
        let mut room_a = Room::new("A", "");
        let mut room_b = Room::new("B", "");
        room_b.is_starting = true;
        let id_b = room_b.id;
        let graph = RoomGraph::new(vec![room_a.clone(), room_b]);
        assert_eq!(graph.starting_room(), Some(id_b));
        room_a.is_starting = false;
        assert!(RoomGraph::new(vec![room_a]).starting_room().is_none());
    }

    #[test]
    fn path_exists_is_false_for_disconnected_rooms() {
        let room_a = Room::new("A", "");
        let room_b = Room::new("B", "");
        let id_a = room_a.id;
        let id_b = room_b.id;
        let graph = RoomGraph::new(vec![room_a, room_b]);
        assert!(!graph.path_exists(id_a, id_b));
    }
}
