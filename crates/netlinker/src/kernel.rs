//! Kernel-backed route handle.
//!
//! Talks `NETLINK_ROUTE` to the running kernel. Mutations need
//! `CAP_NET_ADMIN`; listings do not. On non-Linux platforms the handle
//! cannot be constructed.

#[cfg(target_os = "linux")]
mod linux {
    use crate::config::KernelConfig;
    use crate::error::{Result, RouteError};
    use crate::filter::RouteFilter;
    use crate::handle::RouteHandle;
    use crate::route::{NewDestination, NextHop, Route};
    use crate::validate::validate_route;
    use netlink_packet_core::{NetlinkHeader, NetlinkMessage, NetlinkPayload};
    use netlink_packet_core::{NLM_F_ACK, NLM_F_CREATE, NLM_F_DUMP, NLM_F_EXCL, NLM_F_REQUEST};
    use netlink_packet_route::route::{
        MplsLabel, RouteAddress, RouteAttribute, RouteFlags, RouteMessage,
        RouteNextHop, RouteProtocol, RouteScope, RouteType, RouteVia,
    };
    use netlink_packet_route::{AddressFamily as NlFamily, RouteNetlinkMessage};
    use netlink_sys::{protocols::NETLINK_ROUTE, Socket, SocketAddr};
    use netlinker_types::{AddressFamily, FamilyFilter, IpAddress, IpPrefix};
    use std::os::fd::AsRawFd;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tracing::{debug, instrument, trace, warn};

    /// Main routing table id (`RT_TABLE_MAIN`).
    const RT_TABLE_MAIN: u32 = 254;

    /// Header table value when the id only fits in `RTA_TABLE`.
    const RT_TABLE_UNSPEC: u8 = 0;

    const RTPROT_UNSPEC: u8 = 0;
    const RT_SCOPE_NOWHERE: u8 = 253;
    const RTN_UNSPEC: u8 = 0;

    /// Label width used for MPLS destinations.
    const MPLS_PREFIX_LEN: u8 = 20;

    /// Route handle backed by a netlink socket.
    pub struct KernelHandle {
        socket: Socket,
        sequence: AtomicU32,
        route_protocol: u8,
    }

    impl KernelHandle {
        /// Opens a netlink socket with default settings.
        pub fn new() -> Result<Self> {
            Self::with_config(&KernelConfig::default())
        }

        /// Opens a netlink socket tuned by `config`.
        #[instrument(skip_all)]
        pub fn with_config(config: &KernelConfig) -> Result<Self> {
            let mut socket = Socket::new(NETLINK_ROUTE)
                .map_err(|e| RouteError::netlink("socket", format!("failed to create: {}", e)))?;
            socket
                .bind_auto()
                .map_err(|e| RouteError::netlink("socket", format!("failed to bind: {}", e)))?;
            socket
                .connect(&SocketAddr::new(0, 0))
                .map_err(|e| RouteError::netlink("socket", format!("failed to connect: {}", e)))?;

            let handle = Self {
                socket,
                sequence: AtomicU32::new(1),
                route_protocol: config.route_protocol,
            };
            handle.set_recv_buffer(config.recv_buffer_size);

            debug!("Netlink route socket connected");
            Ok(handle)
        }

        fn set_recv_buffer(&self, size: usize) {
            let fd = self.socket.as_raw_fd();
            let size = libc::c_int::try_from(size).unwrap_or(libc::c_int::MAX);
            // SAFETY: fd is a live socket owned by self and the option value
            // points at a c_int of the advertised length.
            let ret = unsafe {
                libc::setsockopt(
                    fd,
                    libc::SOL_SOCKET,
                    libc::SO_RCVBUF,
                    &size as *const _ as *const libc::c_void,
                    std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                warn!("Failed to set SO_RCVBUF, using default buffer size");
            } else {
                debug!(size, "Set socket receive buffer");
            }
        }

        fn next_sequence(&self) -> u32 {
            self.sequence.fetch_add(1, Ordering::Relaxed)
        }

        fn send(&self, flags: u16, payload: RouteNetlinkMessage) -> Result<u32> {
            let sequence = self.next_sequence();

            let mut header = NetlinkHeader::default();
            header.flags = flags;
            header.sequence_number = sequence;

            let mut packet = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
            packet.finalize();

            let mut buf = vec![0u8; packet.buffer_len()];
            packet.serialize(&mut buf);

            self.socket
                .send(&buf, 0)
                .map_err(|e| RouteError::netlink("send", e))?;
            Ok(sequence)
        }

        /// Reads replies for `sequence`, handing each route message to
        /// `on_route`, until an ack, an error or the end of a dump.
        fn receive(
            &self,
            operation: &str,
            sequence: u32,
            mut on_route: impl FnMut(&RouteMessage),
        ) -> Result<()> {
            loop {
                let (buf, _) = self
                    .socket
                    .recv_from_full()
                    .map_err(|e| RouteError::netlink(operation, e))?;

                let mut offset = 0;
                while offset < buf.len() {
                    let msg = NetlinkMessage::<RouteNetlinkMessage>::deserialize(&buf[offset..])
                        .map_err(|e| {
                            RouteError::netlink(operation, format!("failed to parse reply: {}", e))
                        })?;

                    let length = msg.header.length as usize;
                    if length == 0 {
                        return Err(RouteError::netlink(operation, "zero-length reply"));
                    }
                    offset += length;
                    // Align to 4 bytes (netlink alignment requirement)
                    offset = (offset + 3) & !3;

                    if msg.header.sequence_number != sequence {
                        trace!(
                            sequence = msg.header.sequence_number,
                            "Ignoring reply to another request"
                        );
                        continue;
                    }

                    match msg.payload {
                        NetlinkPayload::Done(_) => return Ok(()),
                        NetlinkPayload::Error(err) => {
                            return match err.code {
                                None => Ok(()),
                                Some(code) => Err(errno_error(operation, -code.get())),
                            };
                        }
                        NetlinkPayload::InnerMessage(RouteNetlinkMessage::NewRoute(route)) => {
                            on_route(&route)
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    impl RouteHandle for KernelHandle {
        #[instrument(skip_all, fields(route = %route))]
        fn route_add(&mut self, route: &Route) -> Result<()> {
            validate_route(route)?;

            let message = build_message(route, self.route_protocol);
            let flags = NLM_F_REQUEST
                | NLM_F_ACK
                | NLM_F_CREATE
                | NLM_F_EXCL;
            let sequence = self.send(flags, RouteNetlinkMessage::NewRoute(message))?;
            self.receive("add", sequence, |_| {})?;

            debug!("Kernel route added");
            Ok(())
        }

        #[instrument(skip_all, fields(route = %route))]
        fn route_del(&mut self, route: &Route) -> Result<()> {
            validate_route(route)?;

            // IP deletes leave protocol, scope and type open so any kernel
            // route with the same keys matches. AF_MPLS insists on a unicast
            // universe request either way.
            let mut message = build_message(route, self.route_protocol);
            message.header.protocol = RouteProtocol::from(RTPROT_UNSPEC);
            if message_family(route) != AddressFamily::Mpls {
                message.header.scope = RouteScope::from(RT_SCOPE_NOWHERE);
                message.header.kind = RouteType::from(RTN_UNSPEC);
            }

            let sequence = self.send(
                NLM_F_REQUEST | NLM_F_ACK,
                RouteNetlinkMessage::DelRoute(message),
            )?;
            self.receive("del", sequence, |_| {})?;

            debug!("Kernel route deleted");
            Ok(())
        }

        #[instrument(skip_all, fields(family = %family, mask = %mask))]
        fn route_list_filtered(
            &self,
            family: FamilyFilter,
            query: Option<&Route>,
            mask: RouteFilter,
        ) -> Result<Vec<Route>> {
            let mut request = RouteMessage::default();
            request.header.address_family =
                netlink_family(family.family().unwrap_or(AddressFamily::Unspec));

            let sequence = self.send(
                NLM_F_REQUEST | NLM_F_DUMP,
                RouteNetlinkMessage::GetRoute(request),
            )?;

            let mut routes = Vec::new();
            self.receive("dump", sequence, |message| {
                if message.header.flags.contains(RouteFlags::Cloned) {
                    return;
                }
                let route = route_from_netlink(message);
                if kernel_filter_admits(&route, query, mask) {
                    routes.push(route);
                }
            })?;

            trace!(count = routes.len(), "Kernel listing complete");
            Ok(routes)
        }
    }

    /// Builds the RTM_NEWROUTE/RTM_DELROUTE body for `route`.
    fn build_message(route: &Route, route_protocol: u8) -> RouteMessage {
        let family = message_family(route);
        let mut message = RouteMessage::default();
        message.header.address_family = netlink_family(family);
        message.header.protocol = RouteProtocol::from(route_protocol);
        message.header.kind = RouteType::Unicast;
        // AF_MPLS only accepts universe scope.
        let on_link = family != AddressFamily::Mpls
            && route.gw.is_none()
            && route.multipath.is_empty()
            && route.link_index != 0;
        message.header.scope = if on_link {
            RouteScope::Link
        } else {
            RouteScope::Universe
        };

        if let Some(dst) = &route.dst {
            message.header.destination_prefix_length = dst.prefix_len();
            message
                .attributes
                .push(RouteAttribute::Destination(route_address(dst.address())));
        } else if let Some(label) = route.mpls_dst {
            message.header.destination_prefix_length = MPLS_PREFIX_LEN;
            message
                .attributes
                .push(RouteAttribute::Destination(RouteAddress::Mpls(mpls_label(
                    label, true,
                ))));
        }

        if let Some(new_dst) = &route.new_dst {
            message.attributes.push(new_dst_attribute(new_dst));
        }
        if let Some(src) = &route.src {
            message
                .attributes
                .push(RouteAttribute::PrefSource(route_address(src)));
        }
        if let Some(gw) = &route.gw {
            message
                .attributes
                .push(RouteAttribute::Gateway(route_address(gw)));
        }
        if route.link_index != 0 {
            message.attributes.push(RouteAttribute::Oif(route.link_index));
        }
        if route.ilink_index != 0 {
            message.attributes.push(RouteAttribute::Iif(route.ilink_index));
        }

        // Ids that fit the header travel there alone; AF_MPLS rejects
        // RTA_TABLE outright.
        let table = if route.table == 0 { RT_TABLE_MAIN } else { route.table };
        match u8::try_from(table) {
            Ok(id) => message.header.table = id,
            Err(_) => {
                message.header.table = RT_TABLE_UNSPEC;
                if family != AddressFamily::Mpls {
                    message.attributes.push(RouteAttribute::Table(table));
                }
            }
        }

        if !route.multipath.is_empty() {
            let hops = route.multipath.iter().map(next_hop_to_netlink).collect();
            message.attributes.push(RouteAttribute::MultiPath(hops));
        }

        message
    }

    /// Maps a kernel errno to the handle's error kinds.
    fn errno_error(operation: &str, errno: i32) -> RouteError {
        match errno {
            libc::EEXIST => RouteError::DuplicateRoute,
            libc::ESRCH => RouteError::RouteNotFound,
            _ => RouteError::netlink(operation, std::io::Error::from_raw_os_error(errno)),
        }
    }

    /// Applies the kernel provider's listing rules.
    ///
    /// Unlike the mock, tables and full destination prefixes are compared,
    /// and routes outside the main table only appear when `TABLE` is
    /// selected.
    fn kernel_filter_admits(route: &Route, query: Option<&Route>, mask: RouteFilter) -> bool {
        let table_selected = query.is_some() && mask.contains(RouteFilter::TABLE);
        if route.table != RT_TABLE_MAIN && !table_selected {
            return false;
        }
        match query {
            Some(query) => kernel_fields_match(route, query, mask),
            None => true,
        }
    }

    fn kernel_fields_match(route: &Route, query: &Route, mask: RouteFilter) -> bool {
        if mask.contains(RouteFilter::TABLE) && query.table != 0 && route.table != query.table {
            return false;
        }
        if mask.contains(RouteFilter::OIF) && route.link_index != query.link_index {
            return false;
        }
        if mask.contains(RouteFilter::IIF) && route.ilink_index != query.ilink_index {
            return false;
        }
        if mask.contains(RouteFilter::GW) && route.gw != query.gw {
            return false;
        }
        if mask.contains(RouteFilter::SRC) && route.src != query.src {
            return false;
        }
        if mask.contains(RouteFilter::DST) {
            let same_label =
                matches!((query.mpls_dst, route.mpls_dst), (Some(a), Some(b)) if a == b);
            if !same_label {
                let family = route.family();
                let wanted = query.dst.or_else(|| IpPrefix::default_route(family));
                let have = route.dst.or_else(|| IpPrefix::default_route(family));
                if wanted != have {
                    return false;
                }
            }
        }
        true
    }

    fn message_family(route: &Route) -> AddressFamily {
        if route.dst.is_none() && route.mpls_dst.is_some() {
            return AddressFamily::Mpls;
        }
        route.family()
    }

    fn netlink_family(family: AddressFamily) -> NlFamily {
        match family {
            AddressFamily::Unspec => NlFamily::Unspec,
            AddressFamily::V4 => NlFamily::Inet,
            AddressFamily::V6 => NlFamily::Inet6,
            AddressFamily::Mpls => NlFamily::Mpls,
        }
    }

    fn route_address(addr: &IpAddress) -> RouteAddress {
        match addr {
            IpAddress::V4(v4) => RouteAddress::Inet(*v4),
            IpAddress::V6(v6) => RouteAddress::Inet6(*v6),
        }
    }

    fn ip_from_route_address(addr: &RouteAddress) -> Option<IpAddress> {
        match addr {
            RouteAddress::Inet(v4) => Some(IpAddress::from(*v4)),
            RouteAddress::Inet6(v6) => Some(IpAddress::from(*v6)),
            _ => None,
        }
    }

    fn mpls_label(label: u32, bottom_of_stack: bool) -> MplsLabel {
        MplsLabel {
            label,
            traffic_class: 0,
            bottom_of_stack,
            ttl: 0,
        }
    }

    fn new_dst_attribute(new_dst: &NewDestination) -> RouteAttribute {
        match new_dst {
            NewDestination::Mpls(labels) => {
                let last = labels.len().saturating_sub(1);
                RouteAttribute::NewDestination(
                    labels
                        .iter()
                        .enumerate()
                        .map(|(i, label)| mpls_label(*label, i == last))
                        .collect(),
                )
            }
            NewDestination::Via(IpAddress::V4(v4)) => RouteAttribute::Via(RouteVia::Inet(*v4)),
            NewDestination::Via(IpAddress::V6(v6)) => RouteAttribute::Via(RouteVia::Inet6(*v6)),
        }
    }

    fn new_dst_from_attribute(attr: &RouteAttribute) -> Option<NewDestination> {
        match attr {
            RouteAttribute::NewDestination(labels) => Some(NewDestination::Mpls(
                labels.iter().map(|l| l.label).collect(),
            )),
            RouteAttribute::Via(RouteVia::Inet(v4)) => {
                Some(NewDestination::Via(IpAddress::from(*v4)))
            }
            RouteAttribute::Via(RouteVia::Inet6(v6)) => {
                Some(NewDestination::Via(IpAddress::from(*v6)))
            }
            _ => None,
        }
    }

    fn next_hop_to_netlink(hop: &NextHop) -> RouteNextHop {
        let mut next_hop = RouteNextHop::default();
        next_hop.interface_index = hop.link_index;
        if let Some(gw) = &hop.gw {
            next_hop.attributes.push(RouteAttribute::Gateway(route_address(gw)));
        }
        if let Some(new_dst) = &hop.new_dst {
            next_hop.attributes.push(new_dst_attribute(new_dst));
        }
        next_hop
    }

    fn next_hop_from_netlink(next_hop: &RouteNextHop) -> NextHop {
        let mut hop = NextHop::default().with_link_index(next_hop.interface_index);
        for attr in &next_hop.attributes {
            match attr {
                RouteAttribute::Gateway(addr) => hop.gw = ip_from_route_address(addr),
                other => {
                    if let Some(new_dst) = new_dst_from_attribute(other) {
                        hop.new_dst = Some(new_dst);
                    }
                }
            }
        }
        hop
    }

    /// Converts a dumped kernel route into a route descriptor.
    fn route_from_netlink(message: &RouteMessage) -> Route {
        let mut route = Route {
            table: u32::from(message.header.table),
            ..Route::default()
        };

        for attr in &message.attributes {
            match attr {
                RouteAttribute::Destination(RouteAddress::Mpls(label)) => {
                    route.mpls_dst = Some(label.label);
                }
                RouteAttribute::Destination(addr) => {
                    route.dst = ip_from_route_address(addr).and_then(|ip| {
                        IpPrefix::new(ip, message.header.destination_prefix_length).ok()
                    });
                }
                RouteAttribute::PrefSource(addr) => route.src = ip_from_route_address(addr),
                RouteAttribute::Gateway(addr) => route.gw = ip_from_route_address(addr),
                RouteAttribute::Oif(index) => route.link_index = *index,
                RouteAttribute::Iif(index) => route.ilink_index = *index,
                RouteAttribute::Table(table) => route.table = *table,
                RouteAttribute::MultiPath(hops) => {
                    route.multipath = hops.iter().map(next_hop_from_netlink).collect();
                }
                other => {
                    if let Some(new_dst) = new_dst_from_attribute(other) {
                        route.new_dst = Some(new_dst);
                    }
                }
            }
        }

        route
    }

}

#[cfg(target_os = "linux")]
pub use linux::KernelHandle;

/// Stand-in for platforms without netlink.
#[cfg(not(target_os = "linux"))]
mod unsupported {
    use crate::config::KernelConfig;
    use crate::error::{Result, RouteError};
    use crate::filter::RouteFilter;
    use crate::handle::RouteHandle;
    use crate::route::Route;
    use netlinker_types::FamilyFilter;

    pub struct KernelHandle {
        _private: (),
    }

    impl KernelHandle {
        pub fn new() -> Result<Self> {
            Err(RouteError::Unsupported)
        }

        pub fn with_config(_config: &KernelConfig) -> Result<Self> {
            Err(RouteError::Unsupported)
        }
    }

    impl RouteHandle for KernelHandle {
        fn route_add(&mut self, _route: &Route) -> Result<()> {
            Err(RouteError::Unsupported)
        }

        fn route_del(&mut self, _route: &Route) -> Result<()> {
            Err(RouteError::Unsupported)
        }

        fn route_list_filtered(
            &self,
            _family: FamilyFilter,
            _query: Option<&Route>,
            _mask: RouteFilter,
        ) -> Result<Vec<Route>> {
            Err(RouteError::Unsupported)
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use unsupported::KernelHandle;
