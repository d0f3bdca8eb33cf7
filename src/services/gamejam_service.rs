//! Game jam listings, details and the host-only upsert.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use indexmap::IndexSet;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        jam_store::JamStore,
        models::{GameJamEntity, TeamEntity, UserEntity},
        query::{GameJamFilter, PageRequest},
    },
    dto::{
        gamejam::{
            GameJamDetail, GameJamListItem, GameJamsPage, ListGameJamsQuery, SaveGameJamRequest,
            SavedGameJam, TeamView,
        },
        user::UserRef,
    },
    error::ServiceError,
    state::SharedState,
};

/// Return one page of game jams, newest start first.
pub async fn list_game_jams(
    state: &SharedState,
    query: ListGameJamsQuery,
) -> Result<GameJamsPage, ServiceError> {
    let store = state.require_jam_store().await?;
    let page = PageRequest {
        limit: query
            .limit
            .unwrap_or_else(|| state.config().game_jams_page_size()),
        cursor: query.cursor,
    };
    let filter = GameJamFilter::new(query.q, query.time_frame);

    let page = store.find_game_jams(filter, page).await?;
    let teams = teams_by_game_jam(&store, page.items.iter().map(|jam| jam.id).collect()).await?;
    let users = users_by_id(&store, page.items.iter().flat_map(|jam| jam.host_ids.clone())).await?;

    let page = page.map(|jam| {
        let jam_teams = teams.get(&jam.id).map(Vec::as_slice).unwrap_or_default();
        let participant_count = jam_teams
            .iter()
            .flat_map(|team| team.member_ids.iter())
            .collect::<HashSet<_>>()
            .len();

        GameJamListItem {
            hosts: user_refs(&jam.host_ids, &users),
            team_count: jam_teams.len(),
            participant_count,
            id: jam.id,
            name: jam.name,
            description: jam.description,
            start_date: jam.start_date,
            end_date: jam.end_date,
        }
    });

    Ok(GameJamsPage {
        game_jams: page.items,
        next_cursor: page.next_cursor,
        count: page.count,
    })
}

/// Return a game jam with hosts and teams expanded to their members.
pub async fn get_game_jam(state: &SharedState, id: Uuid) -> Result<GameJamDetail, ServiceError> {
    let store = state.require_jam_store().await?;
    let jam = store
        .find_game_jam(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game jam {id} not found")))?;

    expand_game_jams(&store, vec![jam])
        .await?
        .pop()
        .ok_or_else(|| ServiceError::NotFound(format!("game jam {id} not found")))
}

/// Create a game jam hosted by `caller`, or update one `caller` already hosts.
pub async fn save_game_jam(
    state: &SharedState,
    caller: Uuid,
    request: SaveGameJamRequest,
) -> Result<SavedGameJam, ServiceError> {
    let store = state.require_jam_store().await?;
    let now = state.now();
    let description = request.description.unwrap_or_default();

    let jam = match request.id {
        None => GameJamEntity {
            id: Uuid::new_v4(),
            name: request.name,
            description,
            start_date: request.start_date,
            end_date: request.end_date,
            host_ids: vec![caller],
            created_at: now,
            updated_at: now,
        },
        Some(id) => {
            let existing = store
                .find_game_jam(id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("game jam {id} not found")))?;
            if !existing.host_ids.contains(&caller) {
                return Err(ServiceError::Forbidden(format!(
                    "user {caller} does not host game jam {id}"
                )));
            }

            GameJamEntity {
                name: request.name,
                description,
                start_date: request.start_date,
                end_date: request.end_date,
                updated_at: now,
                ..existing
            }
        }
    };

    store.save_game_jam(jam.clone()).await?;
    info!(game_jam_id = %jam.id, host = %caller, "game jam saved");
    Ok(jam.into())
}

/// Expand jams with their hosts and teams, keeping the input order.
pub(crate) async fn expand_game_jams(
    store: &Arc<dyn JamStore>,
    jams: Vec<GameJamEntity>,
) -> Result<Vec<GameJamDetail>, ServiceError> {
    if jams.is_empty() {
        return Ok(Vec::new());
    }

    let mut teams = teams_by_game_jam(store, jams.iter().map(|jam| jam.id).collect()).await?;
    let user_ids = jams
        .iter()
        .flat_map(|jam| jam.host_ids.iter().copied())
        .chain(
            teams
                .values()
                .flatten()
                .flat_map(|team| team.member_ids.iter().copied()),
        );
    let users = users_by_id(store, user_ids).await?;
    debug!(
        jams = jams.len(),
        users = users.len(),
        "expanding game jams"
    );

    Ok(jams
        .into_iter()
        .map(|jam| {
            let teams = teams
                .remove(&jam.id)
                .unwrap_or_default()
                .into_iter()
                .map(|team| TeamView {
                    members: user_refs(&team.member_ids, &users),
                    id: team.id,
                    name: team.name,
                })
                .collect();

            GameJamDetail {
                hosts: user_refs(&jam.host_ids, &users),
                teams,
                id: jam.id,
                name: jam.name,
                description: jam.description,
                start_date: jam.start_date,
                end_date: jam.end_date,
                created_at: jam.created_at,
                updated_at: jam.updated_at,
            }
        })
        .collect())
}

/// Teams of the listed jams grouped by jam, each group ordered by name then id.
async fn teams_by_game_jam(
    store: &Arc<dyn JamStore>,
    game_jam_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<TeamEntity>>, ServiceError> {
    if game_jam_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut grouped: HashMap<Uuid, Vec<TeamEntity>> = HashMap::new();
    for team in store.find_teams_by_game_jams(game_jam_ids).await? {
        grouped.entry(team.game_jam_id).or_default().push(team);
    }
    for teams in grouped.values_mut() {
        teams.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }
    Ok(grouped)
}

/// Fetch the listed users once each.
pub(crate) async fn users_by_id(
    store: &Arc<dyn JamStore>,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, UserEntity>, ServiceError> {
    let ids: IndexSet<Uuid> = ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    Ok(store
        .find_users_by_ids(ids.into_iter().collect())
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect())
}

/// References for `ids` in order; ids without a stored user are skipped.
fn user_refs(ids: &[Uuid], users: &HashMap<Uuid, UserEntity>) -> Vec<UserRef> {
    ids.iter()
        .filter_map(|id| users.get(id))
        .map(UserRef::from)
        .collect()
}
